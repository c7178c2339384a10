//! Request types shared by every backend.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::SourceDocument;
use crate::error::PlanError;
use crate::prompt::{self, RuleSet};
use crate::record::WeeklyPlanRecord;
use crate::schema;

/// Which template produced a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    /// Extraction and expansion from the document alone.
    Initial,
    /// Targeted modification of an existing record.
    Refinement,
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initial => f.write_str("initial"),
            Self::Refinement => f.write_str("refinement"),
        }
    }
}

/// Everything a backend needs for one structured generation call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub mode: GenerationMode,
    /// Full prompt text; in refinement mode it embeds the current record.
    pub prompt: String,
    pub document: SourceDocument,
    /// Response schema the backend must conform to.
    pub schema: &'static Value,
}

impl GenerationRequest {
    /// Initial-mode request for `document` under `rules`.
    pub fn initial(document: SourceDocument, rules: &RuleSet) -> Self {
        Self {
            mode: GenerationMode::Initial,
            prompt: prompt::build_initial_prompt(rules),
            document,
            schema: schema::response_schema(),
        }
    }

    /// Refinement-mode request. Fails on a blank instruction.
    pub fn refinement(
        document: SourceDocument,
        current: &WeeklyPlanRecord,
        instruction: &str,
    ) -> Result<Self, PlanError> {
        Ok(Self {
            mode: GenerationMode::Refinement,
            prompt: prompt::build_refinement_prompt(current, instruction)?,
            document,
            schema: schema::response_schema(),
        })
    }
}
