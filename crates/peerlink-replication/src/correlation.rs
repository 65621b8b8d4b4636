//! Correlation-ID and payload-ID namespaces
//!
//! Correlation IDs tag watch registrations and route raw events inside the
//! engine. Payload IDs are the stable keys the version ledger deduplicates
//! outgoing events by. The two namespaces are distinct and both are
//! wire-adjacent conventions that must be preserved exactly.

use peerlink_model::ServiceName;

/// Correlation ID of the exported-service-list watch (singleton).
pub const EXPORTED_SERVICE_LIST: &str = "exported-service-list";

/// Correlation-ID prefix for per-service health watches.
pub const EXPORTED_SERVICE_PREFIX: &str = "exported-service:";

/// Correlation-ID prefix for per-partition mesh-gateway watches.
pub const MESH_GATEWAY_PREFIX: &str = "mesh-gateway:";

/// Payload-ID prefix for directly replicated service instances.
pub const SERVICE_PAYLOAD_PREFIX: &str = "service:";

/// Payload-ID prefix for synthesized discovery-chain proxies.
pub const DISCOVERY_CHAIN_PAYLOAD_PREFIX: &str = "chain:";

/// Payload ID of the mesh-gateway snapshot (singleton).
pub const MESH_GATEWAY_PAYLOAD_ID: &str = "mesh-gateway";

/// Correlation ID for one exported service's health watch.
pub fn exported_service(service: &ServiceName) -> String {
    format!("{}{}", EXPORTED_SERVICE_PREFIX, service)
}

/// Correlation ID for one partition's mesh-gateway watch.
pub fn mesh_gateway(partition: &str) -> String {
    format!("{}{}", MESH_GATEWAY_PREFIX, partition)
}

/// Payload ID for one exported service's instance set.
pub fn service_payload_id(service: &ServiceName) -> String {
    format!("{}{}", SERVICE_PAYLOAD_PREFIX, service)
}

/// Payload ID for one discovery chain's synthesized proxy records.
pub fn discovery_chain_payload_id(chain: &ServiceName) -> String {
    format!("{}{}", DISCOVERY_CHAIN_PAYLOAD_PREFIX, chain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correlation_ids() {
        let svc = ServiceName::new("web");
        assert_eq!(exported_service(&svc), "exported-service:web");
        assert_eq!(mesh_gateway("default"), "mesh-gateway:default");
    }

    #[test]
    fn test_payload_ids() {
        let svc = ServiceName::new("web");
        assert_eq!(service_payload_id(&svc), "service:web");
        assert_eq!(discovery_chain_payload_id(&svc), "chain:web");
    }

    #[test]
    fn test_qualified_name_round_trip() {
        let svc = ServiceName::in_partition("web", "east");
        let correlation_id = exported_service(&svc);
        assert_eq!(
            correlation_id.strip_prefix(EXPORTED_SERVICE_PREFIX),
            Some("east/default/web")
        );
    }
}
