use serde::{Deserialize, Serialize};

use super::ItemPayload;

/// Flaw categories an auditor may report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlawKind {
    /// Stem is unclear or wrong
    Question,
    /// Distractors are implausible or malformed
    Options,
    /// Explanation does not justify the answer
    Explanation,
    /// Content not supported by the source
    NotFromText,
    /// More than one option is correct
    MultipleCorrect,
    /// No option is correct
    NoCorrect,
    None,
}

impl FlawKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlawKind::Question => "question",
            FlawKind::Options => "options",
            FlawKind::Explanation => "explanation",
            FlawKind::NotFromText => "not_from_text",
            FlawKind::MultipleCorrect => "multiple_correct",
            FlawKind::NoCorrect => "no_correct",
            FlawKind::None => "none",
        }
    }
}

/// Auditor verdict for a single item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditVerdict {
    pub is_valid: bool,
    pub reason: String,
    pub flaw_type: FlawKind,
}

/// Complete replacement returned by a correction request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionPayload {
    pub corrected_question: ItemPayload,
}

/// New explanation returned by a refinement request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinementPayload {
    pub new_explanation: String,
}

/// One case scenario as returned by the model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseScenarioPayload {
    pub case_text: String,
    #[serde(default)]
    pub items: Vec<ItemPayload>,
}

/// Full generation response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationPayload {
    #[serde(default)]
    pub mcqs: Vec<ItemPayload>,
    #[serde(default)]
    pub case_scenarios: Vec<CaseScenarioPayload>,
}
