//! The exported-service list snapshot

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::service::ServiceName;

/// The set of services exported to a peer, as one immutable snapshot.
///
/// Each new watch result replaces the previous snapshot wholesale; there are
/// no partial updates.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExportedServiceList {
    /// Plain services whose instances are replicated directly.
    #[serde(default)]
    pub services: Vec<ServiceName>,
    /// Discovery chains reachable only through mesh gateways.
    #[serde(default)]
    pub disco_chains: Vec<ServiceName>,
}

impl ExportedServiceList {
    /// All discovery-chain names in the snapshot, deduplicated.
    pub fn discovery_chain_set(&self) -> HashSet<ServiceName> {
        self.disco_chains.iter().cloned().collect()
    }
}
