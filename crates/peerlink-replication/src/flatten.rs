//! Health-check flattening
//!
//! Replicated instances carry a single synthetic aggregate check instead of
//! their full check list, so the consuming side never sees local check
//! topology.

use peerlink_model::{HealthCheck, HealthStatus};

/// Collapse an instance's checks into one synthetic overall check.
///
/// An empty input produces no checks. Otherwise the aggregate status is
/// passing unless any check is non-passing, in which case the last
/// non-passing status encountered wins. The check ID is deterministic:
/// `<service_id>:overall-check`, with the service ID falling back to the
/// service name when empty.
pub fn flatten_checks(
    node_name: &str,
    service_id: &str,
    service_name: &str,
    namespace: &str,
    partition: &str,
    checks: &[HealthCheck],
) -> Vec<HealthCheck> {
    if checks.is_empty() {
        return Vec::new();
    }

    let mut status = HealthStatus::Passing;
    for check in checks {
        if !check.status.is_passing() {
            status = check.status;
        }
    }

    let service_id = if service_id.is_empty() {
        service_name
    } else {
        service_id
    };

    vec![HealthCheck {
        check_id: format!("{}:overall-check", service_id),
        name: "overall-check".to_string(),
        status,
        node: node_name.to_string(),
        service_id: service_id.to_string(),
        service_name: service_name.to_string(),
        namespace: namespace.to_string(),
        partition: partition.to_string(),
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(status: HealthStatus) -> HealthCheck {
        HealthCheck {
            check_id: "web-1:serf".to_string(),
            name: "serf".to_string(),
            status,
            node: "node-1".to_string(),
            service_id: "web-1".to_string(),
            service_name: "web".to_string(),
            namespace: String::new(),
            partition: String::new(),
        }
    }

    #[test]
    fn test_flatten_empty_produces_nothing() {
        let flattened = flatten_checks("node-1", "web-1", "web", "", "", &[]);
        assert!(flattened.is_empty());
    }

    #[test]
    fn test_flatten_all_passing() {
        let checks = vec![check(HealthStatus::Passing), check(HealthStatus::Passing)];
        let flattened = flatten_checks("node-1", "web-1", "web", "", "", &checks);
        assert_eq!(flattened.len(), 1);
        assert_eq!(flattened[0].status, HealthStatus::Passing);
        assert_eq!(flattened[0].check_id, "web-1:overall-check");
        assert_eq!(flattened[0].name, "overall-check");
    }

    #[test]
    fn test_flatten_last_non_passing_wins() {
        let checks = vec![
            check(HealthStatus::Passing),
            check(HealthStatus::Warning),
            check(HealthStatus::Passing),
        ];
        let flattened = flatten_checks("node-1", "web-1", "web", "", "", &checks);
        assert_eq!(flattened[0].status, HealthStatus::Warning);

        // Critical followed by warning: the later one wins, severity is not
        // consulted.
        let checks = vec![check(HealthStatus::Critical), check(HealthStatus::Warning)];
        let flattened = flatten_checks("node-1", "web-1", "web", "", "", &checks);
        assert_eq!(flattened[0].status, HealthStatus::Warning);
    }

    #[test]
    fn test_flatten_service_id_fallback() {
        let checks = vec![check(HealthStatus::Passing)];
        let flattened = flatten_checks("node-1", "", "web", "", "", &checks);
        assert_eq!(flattened[0].service_id, "web");
        assert_eq!(flattened[0].check_id, "web:overall-check");
    }

    #[test]
    fn test_flatten_carries_partition_metadata() {
        let checks = vec![check(HealthStatus::Passing)];
        let flattened = flatten_checks("node-1", "web-1", "web", "team-a", "east", &checks);
        assert_eq!(flattened[0].namespace, "team-a");
        assert_eq!(flattened[0].partition, "east");
        assert_eq!(flattened[0].node, "node-1");
    }
}
