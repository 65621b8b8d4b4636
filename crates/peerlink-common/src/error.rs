//! Error types for the Peerlink replication engine

/// Errors raised while processing a single watch event.
///
/// None of these are fatal to a subscription: the event loop logs the error,
/// drops the offending event, and keeps running.
#[derive(thiserror::Error, Debug)]
pub enum ReplicationError {
    #[error("received error event: {0}")]
    ErrorEvent(String),

    #[error("invalid result type {got} for correlation id '{correlation_id}'")]
    TypeMismatch {
        correlation_id: String,
        got: &'static str,
    },

    #[error("unknown correlation id: {0}")]
    UnknownCorrelationId(String),

    #[error("duplicate payload id: {0}")]
    DuplicatePayloadId(String),
}
