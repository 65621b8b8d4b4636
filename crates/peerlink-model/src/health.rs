//! Health checks and check/service/node result sets

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::service::{Node, NodeService};

/// Health check status
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    #[default]
    Passing,
    Warning,
    Critical,
    Maintenance,
}

impl HealthStatus {
    pub fn is_passing(self) -> bool {
        self == Self::Passing
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passing => write!(f, "passing"),
            Self::Warning => write!(f, "warning"),
            Self::Critical => write!(f, "critical"),
            Self::Maintenance => write!(f, "maintenance"),
        }
    }
}

/// A single registered health check
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HealthCheck {
    #[serde(rename = "CheckID")]
    pub check_id: String,
    pub name: String,
    #[serde(default)]
    pub status: HealthStatus,
    pub node: String,
    #[serde(rename = "ServiceID")]
    pub service_id: String,
    pub service_name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub partition: String,
}

/// One service instance together with its node and checks
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CheckServiceNode {
    pub node: Node,
    pub service: NodeService,
    #[serde(default)]
    pub checks: Vec<HealthCheck>,
}

/// A versioned set of service instances, as produced by a catalog watch.
///
/// `index` is the local store's internal version and must be cleared to zero
/// before the set leaves the cluster.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IndexedCheckServiceNodes {
    #[serde(default)]
    pub index: u64,
    #[serde(default)]
    pub nodes: Vec<CheckServiceNode>,
}

impl IndexedCheckServiceNodes {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
