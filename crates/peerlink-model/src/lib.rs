//! Peerlink Model - Catalog data model
//!
//! Data types describing the slice of a service catalog that is replicated
//! across a cluster peering:
//! - `service`: service identity, catalog records, proxy configuration
//! - `health`: health checks and check/service/node result sets
//! - `export`: the exported-service list snapshot

pub mod export;
pub mod health;
pub mod service;

// Re-exports for convenience
pub use export::ExportedServiceList;
pub use health::{CheckServiceNode, HealthCheck, HealthStatus, IndexedCheckServiceNodes};
pub use service::{
    ConnectProxyConfig, Node, NodeService, ServiceAddress, ServiceConnect, ServiceKind,
    ServiceName, Weights,
};
