//! Service identity and catalog record types

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use peerlink_common::{DEFAULT_NAMESPACE, DEFAULT_PARTITION, normalize_partition};

/// Identity of a service in the catalog.
///
/// Equality and hashing are structural; the empty partition/namespace and the
/// literal defaults are distinct values and are normalized only for display
/// and partition comparisons.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceName {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub partition: String,
}

impl ServiceName {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: String::new(),
            partition: String::new(),
        }
    }

    pub fn in_partition(name: impl Into<String>, partition: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: String::new(),
            partition: partition.into(),
        }
    }

    /// Derive a sibling service name (same partition/namespace) with a
    /// different bare name.
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: self.namespace.clone(),
            partition: self.partition.clone(),
        }
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let partition = normalize_partition(&self.partition);
        let namespace = if self.namespace.is_empty() {
            DEFAULT_NAMESPACE
        } else {
            &self.namespace
        };
        if partition == DEFAULT_PARTITION && namespace == DEFAULT_NAMESPACE {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}/{}/{}", partition, namespace, self.name)
        }
    }
}

/// Catalog service kind.
///
/// `Typical` serializes as the empty string, matching the catalog wire
/// convention of omitting the kind for plain services.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceKind {
    #[default]
    #[serde(rename = "")]
    Typical,
    #[serde(rename = "connect-proxy")]
    ConnectProxy,
    #[serde(rename = "mesh-gateway")]
    MeshGateway,
    #[serde(rename = "terminating-gateway")]
    TerminatingGateway,
    #[serde(rename = "ingress-gateway")]
    IngressGateway,
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Typical => write!(f, "typical"),
            Self::ConnectProxy => write!(f, "connect-proxy"),
            Self::MeshGateway => write!(f, "mesh-gateway"),
            Self::TerminatingGateway => write!(f, "terminating-gateway"),
            Self::IngressGateway => write!(f, "ingress-gateway"),
        }
    }
}

/// A node registered in the catalog
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Node {
    pub node: String,
    pub address: String,
    #[serde(default)]
    pub partition: String,
}

/// An additional address a service is reachable on (LAN/WAN/virtual)
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceAddress {
    pub address: String,
    pub port: u16,
}

/// Service weights for load balancing
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Weights {
    #[serde(default = "default_passing_weight")]
    pub passing: i32,
    #[serde(default = "default_warning_weight")]
    pub warning: i32,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            passing: default_passing_weight(),
            warning: default_warning_weight(),
        }
    }
}

fn default_passing_weight() -> i32 {
    1
}

fn default_warning_weight() -> i32 {
    1
}

/// Proxy configuration for connect-proxy services
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConnectProxyConfig {
    pub destination_service_name: String,
    #[serde(rename = "DestinationServiceID")]
    pub destination_service_id: String,
}

/// Connect configuration for mesh-native services
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceConnect {
    #[serde(default)]
    pub native: bool,
}

/// A service instance as registered in the catalog
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NodeService {
    #[serde(default)]
    pub kind: ServiceKind,
    #[serde(rename = "ID")]
    pub id: String,
    pub service: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub partition: String,
    pub address: String,
    pub port: u16,
    #[serde(default)]
    pub socket_path: String,
    #[serde(default)]
    pub tagged_addresses: HashMap<String, ServiceAddress>,
    #[serde(default)]
    pub weights: Weights,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect: Option<ServiceConnect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ConnectProxyConfig>,
}

impl NodeService {
    /// The service's identity, carrying its partition/namespace metadata.
    pub fn service_name(&self) -> ServiceName {
        ServiceName {
            name: self.service.clone(),
            namespace: self.namespace.clone(),
            partition: self.partition.clone(),
        }
    }

    /// Whether the instance carries any connect/proxy configuration.
    pub fn has_connect_references(&self) -> bool {
        self.connect.is_some() || self.proxy.is_some()
    }
}
