//! Generative backend interface.
//!
//! This module defines the [`GenerativeBackend`] trait that every backend
//! adapter implements, the [`GenerationRequest`] it receives, and the
//! [`GeminiBackend`] HTTPS implementation.
//!
//! # Architecture
//!
//! ```text
//! PlanSession --begin_*--> GenerationRequest {prompt, document, schema}
//!     |                          |
//!     |                          v
//!     |              GenerationInvoker::invoke
//!     |                 | resolve credential
//!     |                 v
//!     |              &dyn GenerativeBackend --generate(key, request)--> raw JSON text
//!     |                          |
//!     <--------complete(ticket, outcome)
//! ```

pub mod gemini;
pub mod trait_def;
pub mod types;

pub use gemini::{GeminiBackend, GeminiConfig};
pub use trait_def::{BackendError, GenerativeBackend};
pub use types::{GenerationMode, GenerationRequest};
