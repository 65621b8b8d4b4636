//! Peerlink Common - Shared types and utilities
//!
//! This crate provides the foundational pieces used across all Peerlink
//! components:
//! - Error types for the replication engine
//! - Partition/namespace constants and comparison helpers

pub mod error;

// Re-exports for convenience
pub use error::ReplicationError;

/// Default partition name used when no partition is specified
pub const DEFAULT_PARTITION: &str = "default";

/// Default namespace name used when no namespace is specified
pub const DEFAULT_NAMESPACE: &str = "default";

/// Normalize a partition name, mapping the empty string to the default.
pub fn normalize_partition(partition: &str) -> &str {
    if partition.is_empty() {
        DEFAULT_PARTITION
    } else {
        partition
    }
}

/// Compare two partition names, treating the empty string and the default
/// partition as equal.
pub fn partition_matches(a: &str, b: &str) -> bool {
    normalize_partition(a) == normalize_partition(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_partition() {
        assert_eq!(normalize_partition(""), "default");
        assert_eq!(normalize_partition("default"), "default");
        assert_eq!(normalize_partition("east"), "east");
    }

    #[test]
    fn test_partition_matches() {
        assert!(partition_matches("", "default"));
        assert!(partition_matches("default", ""));
        assert!(partition_matches("", ""));
        assert!(partition_matches("east", "east"));
        assert!(!partition_matches("east", "west"));
        assert!(!partition_matches("", "east"));
    }
}
