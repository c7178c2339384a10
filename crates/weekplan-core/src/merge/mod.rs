//! Result intake: parse raw backend text into a validated record.
//!
//! Parsing checks, in order:
//! - The payload (with any markdown code fence stripped) is JSON.
//! - The JSON matches the response schema.
//! - It deserializes into [`WeeklyPlanRecord`].
//! - There are exactly five daily plans with unique, non-blank day labels.
//! - Every collective activity has exactly three goals.
//!
//! Any failure is a [`PlanError::MalformedResult`]; the caller keeps the
//! previous record untouched.

mod diff;

use std::collections::HashSet;

use serde_json::Value;
use thiserror::Error;

use crate::error::PlanError;
use crate::record::{DAYS_PER_WEEK, GOALS_PER_ACTIVITY, WeeklyPlanRecord};
use crate::schema::{self, SchemaViolation};

pub use diff::{DayDiff, RecordDiff, diff_records, fingerprint};

/// Reasons a backend payload was rejected.
#[derive(Debug, Error)]
pub enum RecordParseError {
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload does not match the response schema: {}", join(.0))]
    Schema(Vec<SchemaViolation>),

    #[error("expected {DAYS_PER_WEEK} daily plans, got {0}")]
    DayCount(usize),

    #[error("daily plan {0} has a blank day label")]
    BlankDay(usize),

    #[error("duplicate day label: {0:?}")]
    DuplicateDay(String),

    #[error("collective activity on {day:?} has {count} goals, expected {GOALS_PER_ACTIVITY}")]
    GoalCount { day: String, count: usize },
}

impl From<RecordParseError> for PlanError {
    fn from(err: RecordParseError) -> Self {
        PlanError::MalformedResult(err.to_string())
    }
}

fn join(violations: &[SchemaViolation]) -> String {
    const SHOWN: usize = 5;
    let mut parts: Vec<String> = violations.iter().take(SHOWN).map(|v| v.to_string()).collect();
    if violations.len() > SHOWN {
        parts.push(format!("and {} more", violations.len() - SHOWN));
    }
    parts.join("; ")
}

/// Parse and validate a raw backend payload.
pub fn parse_record(raw: &str) -> Result<WeeklyPlanRecord, PlanError> {
    parse_record_inner(raw).map_err(|e| {
        tracing::warn!(error = %e, "rejected backend payload");
        PlanError::from(e)
    })
}

fn parse_record_inner(raw: &str) -> Result<WeeklyPlanRecord, RecordParseError> {
    let value: Value = serde_json::from_str(strip_code_fence(raw))?;
    schema::validate(schema::response_schema(), &value).map_err(RecordParseError::Schema)?;
    let record: WeeklyPlanRecord = serde_json::from_value(value)?;
    check_invariants(&record)?;
    Ok(record)
}

fn check_invariants(record: &WeeklyPlanRecord) -> Result<(), RecordParseError> {
    if record.daily_plans.len() != DAYS_PER_WEEK {
        return Err(RecordParseError::DayCount(record.daily_plans.len()));
    }

    let mut seen = HashSet::new();
    for (index, day) in record.daily_plans.iter().enumerate() {
        let label = day.day.trim();
        if label.is_empty() {
            return Err(RecordParseError::BlankDay(index));
        }
        if !seen.insert(label) {
            return Err(RecordParseError::DuplicateDay(label.to_string()));
        }
        let count = day.collective_activity.goals.len();
        if count != GOALS_PER_ACTIVITY {
            return Err(RecordParseError::GoalCount {
                day: label.to_string(),
                count,
            });
        }
    }
    Ok(())
}

/// Remove a surrounding markdown code fence (```json ... ```), if present.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") up to the first newline.
    let body = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
