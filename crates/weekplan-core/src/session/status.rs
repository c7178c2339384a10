//! Serializable session summary.

use serde::Serialize;
use uuid::Uuid;

use super::{PlanSession, PlanState, RequestTicket};
use crate::document::SourceDocument;
use crate::error::PlanError;

/// A [`PlanError`] as shown to API clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    pub kind: &'static str,
    pub message: String,
}

impl From<&PlanError> for ErrorInfo {
    fn from(err: &PlanError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Point-in-time view of a session, without the record itself.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub session_id: Uuid,
    pub state: PlanState,
    pub in_flight: Option<RequestTicket>,
    pub selected_day: usize,
    pub day_count: usize,
    pub refinements: u32,
    pub document: Option<SourceDocument>,
    pub default_rules: bool,
    pub last_error: Option<ErrorInfo>,
}

impl SessionStatus {
    pub(super) fn of(session: &PlanSession) -> Self {
        Self {
            session_id: session.id(),
            state: session.state(),
            in_flight: session.in_flight(),
            selected_day: session.selected_day(),
            day_count: session.record().daily_plans.len(),
            refinements: session.refinement_count(),
            document: session.document().cloned(),
            default_rules: session.rules().is_default(),
            last_error: session.last_error().map(ErrorInfo::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_session_status() {
        let status = PlanSession::new().status();
        assert_eq!(status.state, PlanState::Idle);
        assert_eq!(status.day_count, 1);
        assert!(status.default_rules);
        assert!(status.document.is_none());

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["state"], "idle");
        assert!(json["last_error"].is_null());
    }

    #[test]
    fn error_info_carries_kind() {
        let info = ErrorInfo::from(&PlanError::Configuration("no key".to_string()));
        assert_eq!(info.kind, "configuration");
        assert!(info.message.contains("no key"));
    }
}
