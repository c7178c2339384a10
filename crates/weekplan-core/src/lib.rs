//! Core library for weekplan: turn a photographed or scanned weekly
//! classroom schedule into a detailed five-day activity plan using a
//! schema-constrained generative backend, then refine it with free-text
//! instructions.

pub mod backend;
pub mod credential;
pub mod document;
pub mod error;
pub mod invoker;
pub mod lint;
pub mod merge;
pub mod prompt;
pub mod record;
pub mod render;
pub mod schema;
pub mod session;

pub use backend::{
    BackendError, GeminiBackend, GeminiConfig, GenerationMode, GenerationRequest,
    GenerativeBackend,
};
pub use credential::CredentialResolver;
pub use document::{DocumentError, MAX_DOCUMENT_BYTES, SourceDocument};
pub use error::PlanError;
pub use invoker::GenerationInvoker;
pub use lint::{LintReport, lint_record};
pub use merge::{RecordDiff, diff_records, parse_record};
pub use prompt::RuleSet;
pub use record::{DailyPlan, SegmentKind, WeeklyInfo, WeeklyPlanRecord};
pub use render::DayTable;
pub use session::{Completion, PendingRequest, PlanSession, PlanState, RequestTicket};
