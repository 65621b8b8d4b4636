//! Engine tuning knobs

/// Configuration for one peering subscription.
#[derive(Debug, Clone)]
pub struct SubscriptionConfig {
    /// Capacity of the internal event channel shared by all watch producers.
    /// Producers block when it is full; events are never dropped.
    pub event_buffer: usize,
    /// Initial delay after a failed event, in milliseconds.
    pub error_backoff_base_ms: u64,
    /// Upper bound on the error backoff delay, in milliseconds.
    pub error_backoff_max_ms: u64,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            event_buffer: 1,
            error_backoff_base_ms: 100,
            error_backoff_max_ms: 5000,
        }
    }
}
