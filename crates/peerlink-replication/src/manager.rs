//! The reconciler / event dispatcher and watch manager
//!
//! One reconciler task per peering subscription. It is the single consumer of
//! the internal event channel and the only code that touches
//! `SubscriptionState`; watch producers communicate with it exclusively by
//! sending events.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time;
use tracing::{error, info};

use peerlink_common::{ReplicationError, partition_matches};
use peerlink_model::{IndexedCheckServiceNodes, ServiceName};

use crate::config::SubscriptionConfig;
use crate::correlation;
use crate::event::{UpdateEvent, UpdateResult};
use crate::filter::filter_connect_references;
use crate::flatten::flatten_checks;
use crate::shutdown::ShutdownSignal;
use crate::source::{CatalogSource, WatchRequest};
use crate::state::{PendingPayload, SubscriptionState, WatchHandle};
use crate::synthesize::{create_disco_chain_health, proxy_name_for_discovery_chain};

/// Handles requests to subscribe to replicated catalog events for a peer.
pub struct SubscriptionManager {
    source: Arc<dyn CatalogSource>,
    config: SubscriptionConfig,
}

impl SubscriptionManager {
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self::with_config(source, SubscriptionConfig::default())
    }

    pub fn with_config(source: Arc<dyn CatalogSource>, config: SubscriptionConfig) -> Self {
        Self { source, config }
    }

    /// Start a subscription for one peering and return its outgoing event
    /// stream.
    ///
    /// Returns immediately; all watch registration and reconciliation runs on
    /// a spawned task governed by `shutdown`. The returned channel has
    /// capacity 1: a slow consumer backpressures reconciliation rather than
    /// losing events.
    pub fn subscribe(
        &self,
        peer_id: &str,
        partition: &str,
        shutdown: ShutdownSignal,
    ) -> mpsc::Receiver<UpdateEvent> {
        let (update_tx, update_rx) = mpsc::channel(self.config.event_buffer.max(1));
        let (public_tx, public_rx) = mpsc::channel(1);

        let reconciler = Reconciler {
            source: Arc::clone(&self.source),
            peer_id: peer_id.to_string(),
            state: SubscriptionState::new(partition, update_tx, public_tx),
            shutdown,
        };
        tokio::spawn(reconciler.run(update_rx, self.config.clone()));

        public_rx
    }
}

/// Exponential backoff on repeated failures for the same correlation ID.
struct ErrorBackoff {
    base: Duration,
    max: Duration,
    last_correlation_id: Option<String>,
    delay: Duration,
}

impl ErrorBackoff {
    fn new(config: &SubscriptionConfig) -> Self {
        Self {
            base: Duration::from_millis(config.error_backoff_base_ms),
            max: Duration::from_millis(config.error_backoff_max_ms),
            last_correlation_id: None,
            delay: Duration::ZERO,
        }
    }

    fn reset(&mut self) {
        self.last_correlation_id = None;
        self.delay = Duration::ZERO;
    }

    fn next_delay(&mut self, correlation_id: &str) -> Duration {
        if self.last_correlation_id.as_deref() == Some(correlation_id) {
            self.delay = (self.delay * 2).min(self.max);
        } else {
            self.last_correlation_id = Some(correlation_id.to_string());
            self.delay = self.base;
        }
        self.delay
    }
}

/// The per-subscription state owner.
struct Reconciler {
    source: Arc<dyn CatalogSource>,
    peer_id: String,
    state: SubscriptionState,
    shutdown: ShutdownSignal,
}

impl Reconciler {
    async fn run(mut self, mut update_rx: mpsc::Receiver<UpdateEvent>, config: SubscriptionConfig) {
        info!(
            peer_id = %self.peer_id,
            partition = %self.state.partition,
            "starting peering subscription"
        );
        self.register_static_watches().await;

        let mut backoff = ErrorBackoff::new(&config);
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                event = update_rx.recv() => {
                    let Some(event) = event else { break };
                    let correlation_id = event.correlation_id.clone();
                    match self.handle_event(event).await {
                        Ok(()) => backoff.reset(),
                        Err(e) => {
                            error!(
                                id = %correlation_id,
                                error = %e,
                                "failed to handle update from watch"
                            );
                            let delay = backoff.next_delay(&correlation_id);
                            if !delay.is_zero() {
                                tokio::select! {
                                    _ = self.shutdown.cancelled() => break,
                                    _ = time::sleep(delay) => {}
                                }
                            }
                        }
                    }
                }
            }
        }

        self.state.cancel_all_watches();
        info!(peer_id = %self.peer_id, "peering subscription stopped");
    }

    /// Register the exported-service-list and mesh-gateway watches. A failure
    /// leaves the stream degraded for that correlation ID; it is not fatal.
    async fn register_static_watches(&self) {
        let request = WatchRequest::ExportedServices {
            peer_id: self.peer_id.clone(),
            partition: self.state.partition.clone(),
        };
        if let Err(e) = self
            .source
            .notify(
                request,
                correlation::EXPORTED_SERVICE_LIST.to_string(),
                self.state.update_tx.clone(),
                self.shutdown.clone(),
            )
            .await
        {
            error!(error = %e, "failed to watch exported service list");
        }

        let request = WatchRequest::MeshGateways {
            partition: self.state.partition.clone(),
        };
        if let Err(e) = self
            .source
            .notify(
                request,
                correlation::mesh_gateway(&self.state.partition),
                self.state.update_tx.clone(),
                self.shutdown.clone(),
            )
            .await
        {
            error!(error = %e, "failed to watch mesh gateways");
        }
    }

    async fn handle_event(&mut self, event: UpdateEvent) -> Result<(), ReplicationError> {
        let UpdateEvent {
            correlation_id,
            result,
        } = event;
        let result = result.map_err(ReplicationError::ErrorEvent)?;
        let result_kind = result.kind();
        let shutdown = self.shutdown.clone();

        if correlation_id == correlation::EXPORTED_SERVICE_LIST {
            // Everything starts with the exported service list.
            let UpdateResult::ExportedList(list) = result else {
                return Err(ReplicationError::TypeMismatch {
                    correlation_id,
                    got: result_kind,
                });
            };

            let services = list.services.clone();
            let chains = list.discovery_chain_set();
            self.state.export_list = Some(list);

            let mut pending = PendingPayload::default();
            self.sync_normal_services(&mut pending, &services).await;
            self.sync_discovery_chains(&mut pending, chains);
            self.state.send_pending_events(pending, &shutdown).await;

            self.state.cleanup_event_versions();
            Ok(())
        } else if let Some(name) = correlation_id.strip_prefix(correlation::EXPORTED_SERVICE_PREFIX)
        {
            let UpdateResult::Service(mut csn) = result else {
                return Err(ReplicationError::TypeMismatch {
                    correlation_id,
                    got: result_kind,
                });
            };

            // The local store's version index must not leak to the peer.
            csn.index = 0;

            // Scrub connect material so replicated instances cannot collide
            // with the synthetic entries that point at mesh gateways.
            filter_connect_references(&mut csn);

            for instance in &mut csn.nodes {
                instance.checks = flatten_checks(
                    &instance.node.node,
                    &instance.service.id,
                    &instance.service.service,
                    &instance.service.namespace,
                    &instance.service.partition,
                    &instance.checks,
                );
            }

            let payload_id = format!("{}{}", correlation::SERVICE_PAYLOAD_PREFIX, name);

            // Ferry this one directly along to the destination.
            let mut pending = PendingPayload::default();
            pending.add(payload_id, correlation_id, UpdateResult::Service(csn))?;
            self.state.send_pending_events(pending, &shutdown).await;
            Ok(())
        } else if let Some(partition) = correlation_id.strip_prefix(correlation::MESH_GATEWAY_PREFIX)
        {
            let UpdateResult::MeshGateway(mut csn) = result else {
                return Err(ReplicationError::TypeMismatch {
                    correlation_id,
                    got: result_kind,
                });
            };

            if !partition_matches(partition, &self.state.partition) {
                // Another partition's gateways are irrelevant here.
                return Ok(());
            }

            csn.index = 0;
            self.state.mesh_gateway = Some(csn.clone());

            let mut pending = PendingPayload::default();

            // The gateway snapshot itself is replicated verbatim.
            pending.add(
                correlation::MESH_GATEWAY_PAYLOAD_ID,
                correlation_id,
                UpdateResult::MeshGateway(csn),
            )?;

            if self.state.export_list.is_some() {
                // Regenerate the synthetic records for every tracked chain.
                let chains: Vec<ServiceName> =
                    self.state.connect_services.iter().cloned().collect();
                for chain in &chains {
                    self.emit_event_for_discovery_chain(&mut pending, chain);
                }
            }

            self.state.send_pending_events(pending, &shutdown).await;
            Ok(())
        } else {
            Err(ReplicationError::UnknownCorrelationId(correlation_id))
        }
    }

    /// Reconcile the per-service watch set against the exported set.
    ///
    /// Newly exported services gain a watch; a registration failure leaves
    /// the service unwatched until the next exported-list pass retries it.
    /// Services no longer exported have their watch cancelled and an empty
    /// payload queued so the consumer issues a DELETE; cancellation alone is
    /// not an observable signal downstream.
    async fn sync_normal_services(
        &mut self,
        pending: &mut PendingPayload,
        services: &[ServiceName],
    ) {
        let mut seen: HashSet<&ServiceName> = HashSet::with_capacity(services.len());
        for service in services {
            seen.insert(service);

            if self.state.watched_services.contains_key(service) {
                continue;
            }

            match self.watch_service(service).await {
                Ok(handle) => {
                    self.state.watched_services.insert(service.clone(), handle);
                }
                Err(e) => {
                    error!(service = %service, error = %e, "failed to subscribe to service");
                }
            }
        }

        let removed: Vec<ServiceName> = self
            .state
            .watched_services
            .keys()
            .filter(|service| !seen.contains(service))
            .cloned()
            .collect();
        for service in removed {
            if let Some(handle) = self.state.watched_services.remove(&service) {
                handle.cancel();
            }

            if let Err(e) = pending.add(
                correlation::service_payload_id(&service),
                correlation::exported_service(&service),
                UpdateResult::Service(IndexedCheckServiceNodes::default()),
            ) {
                error!(service = %service, error = %e, "failed to queue delete event for service");
            }
        }
    }

    /// Mirror the tracked discovery-chain set from the latest snapshot.
    fn sync_discovery_chains(&mut self, pending: &mut PendingPayload, chains: HashSet<ServiceName>) {
        for chain in &chains {
            if self.state.connect_services.contains(chain) {
                continue;
            }
            self.state.connect_services.insert(chain.clone());
            self.emit_event_for_discovery_chain(pending, chain);
        }

        let dropped: Vec<ServiceName> = self
            .state
            .connect_services
            .iter()
            .filter(|chain| !chains.contains(chain))
            .cloned()
            .collect();
        for chain in dropped {
            self.state.connect_services.remove(&chain);

            if self.state.mesh_gateway.is_some() {
                // Only worth deleting if an emission could ever have happened.
                let proxy_name = proxy_name_for_discovery_chain(&chain);
                if let Err(e) = pending.add(
                    correlation::discovery_chain_payload_id(&chain),
                    correlation::exported_service(&proxy_name),
                    UpdateResult::Service(IndexedCheckServiceNodes::default()),
                ) {
                    error!(chain = %chain, error = %e, "failed to queue delete event for discovery chain");
                }
            }
        }
    }

    /// Queue the synthetic proxy records for one chain.
    ///
    /// A chain can only be materialized once both the export list and a
    /// mesh-gateway snapshot exist; until then nothing is emitted, not even
    /// an empty set.
    fn emit_event_for_discovery_chain(&self, pending: &mut PendingPayload, chain: &ServiceName) {
        if !self.state.connect_services.contains(chain) {
            return;
        }
        if self.state.export_list.is_none() {
            return;
        }
        let Some(gateways) = &self.state.mesh_gateway else {
            return;
        };

        let proxy_name = proxy_name_for_discovery_chain(chain);
        if let Err(e) = pending.add(
            correlation::discovery_chain_payload_id(chain),
            correlation::exported_service(&proxy_name),
            UpdateResult::Service(create_disco_chain_health(chain, gateways)),
        ) {
            error!(chain = %chain, error = %e, "failed to queue event for discovery chain");
        }
    }

    /// Register a health watch for one exported service, returning its
    /// cancellation handle.
    async fn watch_service(&self, service: &ServiceName) -> Result<WatchHandle, anyhow::Error> {
        let signal = ShutdownSignal::new();
        let request = WatchRequest::ServiceHealth {
            service: service.clone(),
        };
        self.source
            .notify(
                request,
                correlation::exported_service(service),
                self.state.update_tx.clone(),
                signal.clone(),
            )
            .await?;
        Ok(WatchHandle::new(signal))
    }
}
