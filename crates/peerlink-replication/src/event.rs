//! Channel event and result types

use serde::{Deserialize, Serialize};

use peerlink_model::{ExportedServiceList, IndexedCheckServiceNodes};

/// A decoded watch result.
///
/// The shape is fixed by the correlation-ID namespace: decoding happens once
/// at the channel boundary, and the dispatcher verifies that the variant
/// matches the correlation ID it arrived under.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum UpdateResult {
    ExportedList(ExportedServiceList),
    Service(IndexedCheckServiceNodes),
    MeshGateway(IndexedCheckServiceNodes),
}

impl UpdateResult {
    /// Short name of the payload shape, for error reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ExportedList(_) => "exported-service-list",
            Self::Service(_) => "service-health",
            Self::MeshGateway(_) => "mesh-gateway-health",
        }
    }
}

/// Wire unit of the internal and public event channels.
///
/// Events on the public channel always carry `Ok`; watch errors are consumed
/// by the reconciler and never reach the transport.
#[derive(Debug)]
pub struct UpdateEvent {
    pub correlation_id: String,
    pub result: Result<UpdateResult, String>,
}

impl UpdateEvent {
    pub fn new(correlation_id: impl Into<String>, result: UpdateResult) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            result: Ok(result),
        }
    }

    pub fn error(correlation_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            result: Err(message.into()),
        }
    }
}
