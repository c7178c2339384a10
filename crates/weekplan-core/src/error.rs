//! Error taxonomy for the generate / refine pipeline.
//!
//! Every variant is recoverable at the boundary of a single action: the
//! session clears its in-flight flag, keeps the previous record, and
//! surfaces the message.

use thiserror::Error;
use uuid::Uuid;

use crate::session::PlanState;

/// Errors produced by a generate or refine action.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlanError {
    /// The action was rejected before any backend call (no document, blank
    /// instruction, nothing to refine, day out of range).
    #[error("validation error: {0}")]
    Validation(String),

    /// No backend credential could be resolved.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Transport, quota or server-side failure reported by the backend.
    #[error("backend error: {0}")]
    Backend(String),

    /// The backend answered but returned no payload.
    #[error("backend returned an empty response")]
    EmptyResponse,

    /// The payload is present but does not match the declared schema.
    #[error("malformed result: {0}")]
    MalformedResult(String),

    /// Another request is already in flight for this session.
    #[error("a request is already in flight (state: {0})")]
    Busy(PlanState),

    /// The completed request is no longer the session's in-flight request.
    #[error("request {0} is no longer in flight")]
    StaleRequest(Uuid),
}

impl PlanError {
    /// Short machine-readable kind, used in API payloads and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Configuration(_) => "configuration",
            Self::Backend(_) => "backend",
            Self::EmptyResponse => "empty_response",
            Self::MalformedResult(_) => "malformed_result",
            Self::Busy(_) => "busy",
            Self::StaleRequest(_) => "stale_request",
        }
    }

    /// Whether the error was raised before the backend was contacted.
    pub fn is_pre_flight(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Busy(_))
    }
}
