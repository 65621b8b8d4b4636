//! Subscription state, pending batches, and the version ledger
//!
//! `SubscriptionState` is owned exclusively by the reconciler task; every
//! other task communicates with it only by sending events on the internal
//! channel.

use std::collections::{HashMap, HashSet};

use md5::{Digest, Md5};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use peerlink_common::ReplicationError;
use peerlink_model::{ExportedServiceList, IndexedCheckServiceNodes, ServiceName};

use crate::correlation;
use crate::event::{UpdateEvent, UpdateResult};
use crate::shutdown::ShutdownSignal;

/// Cancellation handle for one service watch.
pub(crate) struct WatchHandle {
    signal: ShutdownSignal,
}

impl WatchHandle {
    pub(crate) fn new(signal: ShutdownSignal) -> Self {
        Self { signal }
    }

    pub(crate) fn cancel(&self) {
        self.signal.shutdown();
    }
}

/// One queued outgoing event, keyed by its payload ID.
pub(crate) struct PendingEvent {
    pub(crate) payload_id: String,
    pub(crate) correlation_id: String,
    pub(crate) result: UpdateResult,
}

/// Accumulator for the payload updates produced by one reconciliation pass.
///
/// Insertion order is preserved. Adding two entries under the same payload ID
/// within one pass indicates inconsistent bookkeeping and fails.
#[derive(Default)]
pub(crate) struct PendingPayload {
    events: Vec<PendingEvent>,
    seen: HashSet<String>,
}

impl PendingPayload {
    pub(crate) fn add(
        &mut self,
        payload_id: impl Into<String>,
        correlation_id: impl Into<String>,
        result: UpdateResult,
    ) -> Result<(), ReplicationError> {
        let payload_id = payload_id.into();
        if !self.seen.insert(payload_id.clone()) {
            return Err(ReplicationError::DuplicatePayloadId(payload_id));
        }
        self.events.push(PendingEvent {
            payload_id,
            correlation_id: correlation_id.into(),
            result,
        });
        Ok(())
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// The mutable record of one peering subscription.
pub(crate) struct SubscriptionState {
    /// Partition this subscription serves, fixed at creation.
    pub(crate) partition: String,
    /// Latest exported-service snapshot, none until first received.
    pub(crate) export_list: Option<ExportedServiceList>,
    /// Active per-service watches. Keys track the currently exported plain
    /// services.
    pub(crate) watched_services: HashMap<ServiceName, WatchHandle>,
    /// Discovery chains currently synthesized.
    pub(crate) connect_services: HashSet<ServiceName>,
    /// Latest mesh-gateway snapshot for the partition, none until first
    /// received.
    pub(crate) mesh_gateway: Option<IndexedCheckServiceNodes>,
    /// Sender side of the internal channel, handed to watch producers.
    pub(crate) update_tx: mpsc::Sender<UpdateEvent>,
    /// Outgoing channel to the replication transport; bounded, so a slow
    /// consumer backpressures the flush step.
    public_tx: mpsc::Sender<UpdateEvent>,
    /// Payload ID -> fingerprint of the last sent result.
    event_versions: HashMap<String, String>,
}

impl SubscriptionState {
    pub(crate) fn new(
        partition: impl Into<String>,
        update_tx: mpsc::Sender<UpdateEvent>,
        public_tx: mpsc::Sender<UpdateEvent>,
    ) -> Self {
        Self {
            partition: partition.into(),
            export_list: None,
            watched_services: HashMap::new(),
            connect_services: HashSet::new(),
            mesh_gateway: None,
            update_tx,
            public_tx,
            event_versions: HashMap::new(),
        }
    }

    /// Flush a pending batch to the public channel.
    ///
    /// Entries whose fingerprint matches the last sent version are dropped;
    /// the rest are sent in insertion order, blocking when the public channel
    /// is full. Returns early if shutdown fires or the consumer is gone.
    pub(crate) async fn send_pending_events(
        &mut self,
        pending: PendingPayload,
        shutdown: &ShutdownSignal,
    ) {
        for pending_event in pending.events {
            let version = fingerprint(&pending_event.result);
            if let Some(version) = &version
                && self.event_versions.get(&pending_event.payload_id) == Some(version)
            {
                debug!(
                    payload_id = %pending_event.payload_id,
                    "skipping unchanged event"
                );
                continue;
            }

            let event = UpdateEvent::new(pending_event.correlation_id, pending_event.result);
            tokio::select! {
                _ = shutdown.cancelled() => return,
                sent = self.public_tx.send(event) => {
                    if sent.is_err() {
                        warn!("public event channel closed, dropping pending events");
                        return;
                    }
                }
            }

            if let Some(version) = version {
                self.event_versions.insert(pending_event.payload_id, version);
            }
        }
    }

    /// Drop ledger entries whose payload ID is no longer derivable from
    /// current state, bounding ledger growth over a long-lived peering.
    pub(crate) fn cleanup_event_versions(&mut self) {
        let mut keep: HashSet<String> =
            HashSet::with_capacity(self.watched_services.len() + self.connect_services.len() + 1);
        keep.insert(correlation::MESH_GATEWAY_PAYLOAD_ID.to_string());
        for service in self.watched_services.keys() {
            keep.insert(correlation::service_payload_id(service));
        }
        for chain in &self.connect_services {
            keep.insert(correlation::discovery_chain_payload_id(chain));
        }

        let before = self.event_versions.len();
        self.event_versions.retain(|id, _| keep.contains(id));
        let purged = before - self.event_versions.len();
        if purged > 0 {
            debug!(purged, "purged stale event versions");
        }
    }

    /// Cancel every per-service watch. Called at teardown.
    pub(crate) fn cancel_all_watches(&mut self) {
        for (_, handle) in self.watched_services.drain() {
            handle.cancel();
        }
    }
}

/// Content fingerprint used for no-op suppression.
fn fingerprint(result: &UpdateResult) -> Option<String> {
    match serde_json::to_vec(result) {
        Ok(bytes) => Some(format!("{:x}", Md5::digest(&bytes))),
        Err(e) => {
            warn!(error = %e, "failed to fingerprint event payload");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peerlink_model::{CheckServiceNode, Node, NodeService};

    fn service_nodes(name: &str, port: u16) -> IndexedCheckServiceNodes {
        IndexedCheckServiceNodes {
            index: 0,
            nodes: vec![CheckServiceNode {
                node: Node {
                    node: "node-1".to_string(),
                    address: "10.0.0.1".to_string(),
                    partition: String::new(),
                },
                service: NodeService {
                    id: format!("{}-1", name),
                    service: name.to_string(),
                    address: "10.0.0.1".to_string(),
                    port,
                    ..Default::default()
                },
                checks: Vec::new(),
            }],
        }
    }

    fn new_state() -> (
        SubscriptionState,
        mpsc::Receiver<UpdateEvent>,
        mpsc::Receiver<UpdateEvent>,
    ) {
        let (update_tx, update_rx) = mpsc::channel(1);
        let (public_tx, public_rx) = mpsc::channel(8);
        (
            SubscriptionState::new("default", update_tx, public_tx),
            update_rx,
            public_rx,
        )
    }

    #[test]
    fn test_pending_payload_rejects_duplicate_ids() {
        let mut pending = PendingPayload::default();
        pending
            .add(
                "service:web",
                "exported-service:web",
                UpdateResult::Service(IndexedCheckServiceNodes::default()),
            )
            .unwrap();

        let err = pending
            .add(
                "service:web",
                "exported-service:web",
                UpdateResult::Service(IndexedCheckServiceNodes::default()),
            )
            .unwrap_err();
        assert!(matches!(err, ReplicationError::DuplicatePayloadId(id) if id == "service:web"));
    }

    #[tokio::test]
    async fn test_send_pending_suppresses_unchanged() {
        let (mut state, _update_rx, mut public_rx) = new_state();
        let shutdown = ShutdownSignal::new();

        let mut pending = PendingPayload::default();
        pending
            .add(
                "service:web",
                "exported-service:web",
                UpdateResult::Service(service_nodes("web", 8080)),
            )
            .unwrap();
        state.send_pending_events(pending, &shutdown).await;
        assert!(public_rx.try_recv().is_ok());

        // Identical content again: suppressed.
        let mut pending = PendingPayload::default();
        pending
            .add(
                "service:web",
                "exported-service:web",
                UpdateResult::Service(service_nodes("web", 8080)),
            )
            .unwrap();
        state.send_pending_events(pending, &shutdown).await;
        assert!(public_rx.try_recv().is_err());

        // Changed content: sent.
        let mut pending = PendingPayload::default();
        pending
            .add(
                "service:web",
                "exported-service:web",
                UpdateResult::Service(service_nodes("web", 9090)),
            )
            .unwrap();
        state.send_pending_events(pending, &shutdown).await;
        assert!(public_rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_send_pending_preserves_insertion_order() {
        let (mut state, _update_rx, mut public_rx) = new_state();
        let shutdown = ShutdownSignal::new();

        let mut pending = PendingPayload::default();
        pending
            .add(
                "service:a",
                "exported-service:a",
                UpdateResult::Service(service_nodes("a", 1)),
            )
            .unwrap();
        pending
            .add(
                "service:b",
                "exported-service:b",
                UpdateResult::Service(service_nodes("b", 2)),
            )
            .unwrap();
        state.send_pending_events(pending, &shutdown).await;

        let first = public_rx.try_recv().unwrap();
        let second = public_rx.try_recv().unwrap();
        assert_eq!(first.correlation_id, "exported-service:a");
        assert_eq!(second.correlation_id, "exported-service:b");
    }

    #[tokio::test]
    async fn test_send_pending_stops_on_shutdown() {
        let (mut state, _update_rx, public_rx) = new_state();
        let shutdown = ShutdownSignal::new();
        shutdown.shutdown();
        drop(public_rx);

        let mut pending = PendingPayload::default();
        pending
            .add(
                "service:web",
                "exported-service:web",
                UpdateResult::Service(service_nodes("web", 8080)),
            )
            .unwrap();
        // Must return without hanging on the closed/full channel.
        state.send_pending_events(pending, &shutdown).await;
    }

    #[tokio::test]
    async fn test_cleanup_event_versions_keeps_live_ids() {
        let (mut state, _update_rx, mut public_rx) = new_state();
        let shutdown = ShutdownSignal::new();

        let web = ServiceName::new("web");
        state
            .watched_services
            .insert(web.clone(), WatchHandle::new(ShutdownSignal::new()));
        state.connect_services.insert(ServiceName::new("billing"));

        let mut pending = PendingPayload::default();
        pending
            .add(
                correlation::service_payload_id(&web),
                "exported-service:web",
                UpdateResult::Service(service_nodes("web", 8080)),
            )
            .unwrap();
        pending
            .add(
                "service:stale",
                "exported-service:stale",
                UpdateResult::Service(IndexedCheckServiceNodes::default()),
            )
            .unwrap();
        state.send_pending_events(pending, &shutdown).await;
        while public_rx.try_recv().is_ok() {}

        state.cleanup_event_versions();

        // The stale service's ledger entry is gone: an identical payload for
        // it would be sent again.
        let mut pending = PendingPayload::default();
        pending
            .add(
                "service:stale",
                "exported-service:stale",
                UpdateResult::Service(IndexedCheckServiceNodes::default()),
            )
            .unwrap();
        state.send_pending_events(pending, &shutdown).await;
        assert!(public_rx.try_recv().is_ok());

        // The watched service's entry survived: identical payload suppressed.
        let mut pending = PendingPayload::default();
        pending
            .add(
                correlation::service_payload_id(&web),
                "exported-service:web",
                UpdateResult::Service(service_nodes("web", 8080)),
            )
            .unwrap();
        state.send_pending_events(pending, &shutdown).await;
        assert!(public_rx.try_recv().is_err());
    }

    #[test]
    fn test_cancel_all_watches_fires_every_handle() {
        let (update_tx, _update_rx) = mpsc::channel(1);
        let (public_tx, _public_rx) = mpsc::channel(1);
        let mut state = SubscriptionState::new("default", update_tx, public_tx);

        let signal_a = ShutdownSignal::new();
        let signal_b = ShutdownSignal::new();
        state
            .watched_services
            .insert(ServiceName::new("a"), WatchHandle::new(signal_a.clone()));
        state
            .watched_services
            .insert(ServiceName::new("b"), WatchHandle::new(signal_b.clone()));

        state.cancel_all_watches();
        assert!(state.watched_services.is_empty());
        assert!(signal_a.is_shutdown());
        assert!(signal_b.is_shutdown());
    }

    #[test]
    fn test_fingerprint_stable_and_content_sensitive() {
        let a = UpdateResult::Service(service_nodes("web", 8080));
        let b = UpdateResult::Service(service_nodes("web", 8080));
        let c = UpdateResult::Service(service_nodes("web", 9090));
        assert_eq!(fingerprint(&a), fingerprint(&b));
        assert_ne!(fingerprint(&a), fingerprint(&c));
    }
}
