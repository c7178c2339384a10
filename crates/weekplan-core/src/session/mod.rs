//! Plan session: the state machine that owns the current record.
//!
//! A session holds the source document, the rule-set, the current record
//! and the day cursor, and gates generate / refine requests so that at most
//! one is in flight. Requests are split in two halves so the backend call
//! can run without holding the session:
//!
//! ```text
//! begin_generation / begin_refinement  -> PendingRequest { ticket, request }
//! GenerationInvoker::invoke(request)   -> Result<String, PlanError>
//! complete(ticket, outcome)            -> Result<Completion, PlanError>
//! ```
//!
//! Failures restore the previous stable state and never touch the record.

mod status;

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backend::{GenerationMode, GenerationRequest};
use crate::document::SourceDocument;
use crate::error::PlanError;
use crate::invoker::GenerationInvoker;
use crate::lint::{self, LintReport};
use crate::merge::{self, RecordDiff};
use crate::prompt::RuleSet;
use crate::record::{DailyPlan, WeeklyPlanRecord, placeholder_record};

pub use status::{ErrorInfo, SessionStatus};

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanState {
    /// No record generated yet (placeholder shown).
    Idle,
    /// Initial generation in flight.
    Generating,
    /// A generated record is installed.
    Generated,
    /// Refinement in flight.
    Refining,
}

impl PlanState {
    /// Check whether `from -> to` is an edge in the state graph:
    ///
    /// ```text
    /// idle       -> generating
    /// generated  -> generating
    /// generated  -> refining
    /// generating -> generated | idle
    /// refining   -> generated
    /// *          -> idle      (reset)
    /// ```
    pub fn is_valid_transition(from: PlanState, to: PlanState) -> bool {
        matches!(
            (from, to),
            (PlanState::Idle, PlanState::Generating)
                | (PlanState::Generated, PlanState::Generating)
                | (PlanState::Generated, PlanState::Refining)
                | (PlanState::Generating, PlanState::Generated)
                | (PlanState::Refining, PlanState::Generated)
                | (_, PlanState::Idle)
        )
    }

    /// Whether a request is outstanding in this state.
    pub fn is_in_flight(self) -> bool {
        matches!(self, PlanState::Generating | PlanState::Refining)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PlanState::Idle => "idle",
            PlanState::Generating => "generating",
            PlanState::Generated => "generated",
            PlanState::Refining => "refining",
        }
    }
}

impl fmt::Display for PlanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one outstanding request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RequestTicket {
    pub id: Uuid,
    pub mode: GenerationMode,
}

/// A request that has passed the gate and is ready to send.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub ticket: RequestTicket,
    pub request: GenerationRequest,
}

/// What a successful completion installed.
#[derive(Debug, Clone, Serialize)]
pub struct Completion {
    pub mode: GenerationMode,
    /// Format findings for the new record.
    pub lint: LintReport,
    /// Section changes relative to the previous record.
    pub diff: RecordDiff,
}

/// Bookkeeping for the request currently in flight.
#[derive(Debug, Clone, Copy)]
struct InFlight {
    ticket: RequestTicket,
    /// State to return to if the request fails.
    resume: PlanState,
}

/// One user's plan session. Owned by its caller; never global.
#[derive(Debug, Clone)]
pub struct PlanSession {
    id: Uuid,
    state: PlanState,
    record: WeeklyPlanRecord,
    document: Option<SourceDocument>,
    rules: RuleSet,
    selected_day: usize,
    in_flight: Option<InFlight>,
    last_error: Option<PlanError>,
    refinements: u32,
}

impl Default for PlanSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PlanSession {
    /// Fresh session showing the placeholder record.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: PlanState::Idle,
            record: placeholder_record(),
            document: None,
            rules: RuleSet::default(),
            selected_day: 0,
            in_flight: None,
            last_error: None,
            refinements: 0,
        }
    }

    // -- accessors --

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> PlanState {
        self.state
    }

    pub fn record(&self) -> &WeeklyPlanRecord {
        &self.record
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Ticket of the outstanding request, if any.
    pub fn in_flight(&self) -> Option<RequestTicket> {
        self.in_flight.map(|f| f.ticket)
    }

    pub fn selected_day(&self) -> usize {
        self.selected_day
    }

    /// The daily plan under the cursor.
    pub fn selected_plan(&self) -> Option<&DailyPlan> {
        self.record.daily_plans.get(self.selected_day)
    }

    pub fn document(&self) -> Option<&SourceDocument> {
        self.document.as_ref()
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn last_error(&self) -> Option<&PlanError> {
        self.last_error.as_ref()
    }

    /// Successful refinements applied to the current record.
    pub fn refinement_count(&self) -> u32 {
        self.refinements
    }

    // -- inputs --

    /// Attach (or replace) the source document. Rejected while a request is
    /// in flight.
    pub fn attach_document(&mut self, document: SourceDocument) -> Result<(), PlanError> {
        self.ensure_idle_gate()?;
        tracing::info!(
            session = %self.id,
            document = document.display_name(),
            media_type = document.media_type(),
            bytes = document.size(),
            "document attached"
        );
        self.document = Some(document);
        Ok(())
    }

    /// Replace the rule-set used by the next initial generation.
    pub fn set_rules(&mut self, rules: RuleSet) -> Result<(), PlanError> {
        self.ensure_idle_gate()?;
        self.rules = rules;
        Ok(())
    }

    /// Move the day cursor. Allowed while a request is in flight.
    pub fn select_day(&mut self, index: usize) -> Result<(), PlanError> {
        let days = self.record.daily_plans.len();
        if index >= days {
            return Err(PlanError::Validation(format!(
                "day {index} is out of range (plan has {days} day(s))"
            )));
        }
        self.selected_day = index;
        Ok(())
    }

    /// Return to `Idle` with the placeholder record. The document and rules
    /// are kept. An outstanding request becomes stale.
    pub fn reset(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            tracing::info!(
                session = %self.id,
                request_id = %in_flight.ticket.id,
                "reset abandons in-flight request"
            );
        }
        self.state = PlanState::Idle;
        self.record = placeholder_record();
        self.selected_day = 0;
        self.last_error = None;
        self.refinements = 0;
    }

    // -- request gate --

    /// Open an initial-generation request.
    pub fn begin_generation(&mut self) -> Result<PendingRequest, PlanError> {
        self.ensure_idle_gate()?;
        let document = self.require_document()?;
        let request = GenerationRequest::initial(document, &self.rules);
        self.open(request)
    }

    /// Open a refinement request for `instruction`.
    pub fn begin_refinement(&mut self, instruction: &str) -> Result<PendingRequest, PlanError> {
        self.ensure_idle_gate()?;
        if self.state != PlanState::Generated {
            return Err(PlanError::Validation(
                "nothing to refine; generate a plan first".to_string(),
            ));
        }
        let document = self.require_document()?;
        let request = GenerationRequest::refinement(document, &self.record, instruction)?;
        self.open(request)
    }

    /// Close the request identified by `ticket` with the backend outcome.
    ///
    /// On success the parsed record replaces the current one. On failure the
    /// previous stable state is restored, the record is left untouched and
    /// the error is kept as `last_error`.
    pub fn complete(
        &mut self,
        ticket: RequestTicket,
        outcome: Result<String, PlanError>,
    ) -> Result<Completion, PlanError> {
        let in_flight = match self.in_flight {
            Some(f) if f.ticket.id == ticket.id => f,
            _ => {
                tracing::warn!(
                    session = %self.id,
                    request_id = %ticket.id,
                    "dropping result for a request that is no longer in flight"
                );
                return Err(PlanError::StaleRequest(ticket.id));
            }
        };
        self.in_flight = None;

        match outcome.and_then(|raw| merge::parse_record(&raw)) {
            Ok(record) => {
                self.transition(PlanState::Generated);
                let diff = merge::diff_records(&self.record, &record);
                let lint = lint::lint_record(&record);
                self.record = record;
                self.last_error = None;
                match ticket.mode {
                    GenerationMode::Initial => {
                        self.selected_day = 0;
                        self.refinements = 0;
                    }
                    GenerationMode::Refinement => {
                        self.refinements += 1;
                        if diff.weekly_info_changed || diff.day_count_changed {
                            tracing::warn!(
                                session = %self.id,
                                request_id = %ticket.id,
                                "refinement changed the plan header"
                            );
                        }
                    }
                }
                if self.selected_day >= self.record.daily_plans.len() {
                    self.selected_day = 0;
                }
                tracing::info!(
                    session = %self.id,
                    request_id = %ticket.id,
                    mode = %ticket.mode,
                    changed_days = diff.days.len(),
                    changed_segments = diff.changed_segments(),
                    lint_issues = lint.len(),
                    "plan installed"
                );
                Ok(Completion {
                    mode: ticket.mode,
                    lint,
                    diff,
                })
            }
            Err(err) => {
                self.transition(in_flight.resume);
                tracing::warn!(
                    session = %self.id,
                    request_id = %ticket.id,
                    mode = %ticket.mode,
                    kind = err.kind(),
                    error = %err,
                    state = %self.state,
                    "request failed; previous plan kept"
                );
                self.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Run a full initial generation against `invoker`.
    pub async fn generate(&mut self, invoker: &GenerationInvoker) -> Result<Completion, PlanError> {
        let pending = self.begin_generation()?;
        let outcome = invoker.invoke(&pending.request).await;
        self.complete(pending.ticket, outcome)
    }

    /// Run a full refinement against `invoker`.
    pub async fn refine(
        &mut self,
        invoker: &GenerationInvoker,
        instruction: &str,
    ) -> Result<Completion, PlanError> {
        let pending = self.begin_refinement(instruction)?;
        let outcome = invoker.invoke(&pending.request).await;
        self.complete(pending.ticket, outcome)
    }

    /// Serializable summary for status displays and the HTTP API.
    pub fn status(&self) -> SessionStatus {
        SessionStatus::of(self)
    }

    // -- internals --

    fn ensure_idle_gate(&self) -> Result<(), PlanError> {
        if self.in_flight.is_some() {
            return Err(PlanError::Busy(self.state));
        }
        Ok(())
    }

    fn require_document(&self) -> Result<SourceDocument, PlanError> {
        self.document.clone().ok_or_else(|| {
            PlanError::Validation("no source document attached".to_string())
        })
    }

    fn open(&mut self, request: GenerationRequest) -> Result<PendingRequest, PlanError> {
        let target = match request.mode {
            GenerationMode::Initial => PlanState::Generating,
            GenerationMode::Refinement => PlanState::Refining,
        };
        if !PlanState::is_valid_transition(self.state, target) {
            return Err(PlanError::Validation(format!(
                "invalid state transition: {} -> {}",
                self.state, target
            )));
        }

        let ticket = RequestTicket {
            id: Uuid::new_v4(),
            mode: request.mode,
        };
        self.in_flight = Some(InFlight {
            ticket,
            resume: self.state,
        });
        self.transition(target);
        tracing::info!(
            session = %self.id,
            request_id = %ticket.id,
            mode = %ticket.mode,
            "request opened"
        );
        Ok(PendingRequest { ticket, request })
    }

    fn transition(&mut self, to: PlanState) {
        debug_assert!(
            PlanState::is_valid_transition(self.state, to),
            "invalid state transition: {} -> {}",
            self.state,
            to
        );
        tracing::debug!(session = %self.id, from = %self.state, to = %to, "state transition");
        self.state = to;
    }
}
