//! The catalog watch-substrate contract

use tokio::sync::mpsc;

use peerlink_model::ServiceName;

use crate::event::UpdateEvent;
use crate::shutdown::ShutdownSignal;

/// What a watch observes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WatchRequest {
    /// The list of services exported to one peer.
    ExportedServices { peer_id: String, partition: String },
    /// Healthy instances of one exported service.
    ServiceHealth { service: ServiceName },
    /// Mesh gateways for one partition.
    MeshGateways { partition: String },
}

/// A source of catalog change notifications.
///
/// `notify` registers a long-lived watch; the source owns the producer task
/// and pushes results as [`UpdateEvent`]s tagged with `correlation_id` into
/// `tx` until `shutdown` fires. An `Err` return means registration failed and
/// no producer was started.
#[async_trait::async_trait]
pub trait CatalogSource: Send + Sync {
    async fn notify(
        &self,
        request: WatchRequest,
        correlation_id: String,
        tx: mpsc::Sender<UpdateEvent>,
        shutdown: ShutdownSignal,
    ) -> Result<(), anyhow::Error>;
}
