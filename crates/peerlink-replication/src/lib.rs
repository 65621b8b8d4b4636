//! Peerlink Replication - Subscription and reconciliation engine
//!
//! Maintains, for a single cross-cluster peering, the derived view of the
//! catalog state that should be replicated to the remote peer, expressed as a
//! stream of upsert/delete events keyed by stable payload identifiers.
//!
//! ## Modules
//! - `manager`: the reconciler/event dispatcher and watch manager
//! - `state`: subscription state, pending batches, version ledger
//! - `source`: the catalog watch-substrate contract
//! - `event`: channel event and result types
//! - `correlation`: correlation-ID and payload-ID namespaces
//! - `synthesize`: discovery-chain sidecar-proxy synthesis
//! - `filter`: connect-reference scrubbing for replicated instances
//! - `flatten`: health-check flattening
//! - `shutdown`: cancellation signalling
//! - `config`: engine tuning knobs

pub mod config;
pub mod correlation;
pub mod event;
pub mod filter;
pub mod flatten;
pub mod manager;
pub mod shutdown;
pub mod source;
pub mod synthesize;

mod state;

// Re-exports for convenience
pub use config::SubscriptionConfig;
pub use event::{UpdateEvent, UpdateResult};
pub use manager::SubscriptionManager;
pub use shutdown::ShutdownSignal;
pub use source::{CatalogSource, WatchRequest};
