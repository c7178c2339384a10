//! The `GenerativeBackend` trait: the adapter interface for structured
//! generation services.
//!
//! The trait is object-safe so the invoker can hold an
//! `Arc<dyn GenerativeBackend>` and tests can substitute a scripted fake.

use async_trait::async_trait;
use thiserror::Error;

use super::types::GenerationRequest;

/// Failures reported by a backend call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// The request never completed (DNS, TLS, timeout, connection reset).
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with a non-success HTTP status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The service answered 2xx but reported an error in the body.
    #[error("{0}")]
    Api(String),

    /// The response envelope could not be decoded.
    #[error("unexpected response envelope: {0}")]
    Envelope(String),
}

/// Adapter interface for a schema-constrained generation service.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Human-readable backend name, used in logs.
    fn name(&self) -> &str;

    /// Issue exactly one structured-output request.
    ///
    /// Returns `Ok(None)` when the service answered but produced no content.
    /// Implementations must not retry.
    async fn generate(
        &self,
        api_key: &str,
        request: &GenerationRequest,
    ) -> Result<Option<String>, BackendError>;
}

// Compile-time assertion: GenerativeBackend must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn GenerativeBackend) {}
};
