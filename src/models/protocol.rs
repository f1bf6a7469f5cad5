use std::fmt;

use serde::{Deserialize, Serialize};

/// Pipeline stages in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageId {
    Prepare,
    Generate,
    Shuffle,
    AuditCorrect,
    RefineExplanations,
    Render,
    Finalize,
}

impl StageId {
    /// All stages in the order they run
    pub const ALL: [StageId; 7] = [
        StageId::Prepare,
        StageId::Generate,
        StageId::Shuffle,
        StageId::AuditCorrect,
        StageId::RefineExplanations,
        StageId::Render,
        StageId::Finalize,
    ];

    /// Stable protocol identifier
    pub fn id(&self) -> &'static str {
        match self {
            StageId::Prepare => "p0",
            StageId::Generate => "p1",
            StageId::Shuffle => "p2",
            StageId::AuditCorrect => "p2.8",
            StageId::RefineExplanations => "p2.7",
            StageId::Render => "p3",
            StageId::Finalize => "p4",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StageId::Prepare => "Prepare source data",
            StageId::Generate => "Generate quiz content",
            StageId::Shuffle => "Shuffle answer distribution",
            StageId::AuditCorrect => "Audit and auto-correct",
            StageId::RefineExplanations => "Refine flagged explanations",
            StageId::Render => "Render quiz artifact",
            StageId::Finalize => "Final review",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Pending,
    Active,
    Done,
    Error,
}

/// Tracked status of one pipeline stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolStep {
    pub stage: StageId,
    pub id: String,
    pub label: String,
    pub state: StepState,
}

impl ProtocolStep {
    pub fn pending(stage: StageId) -> Self {
        Self {
            stage,
            id: stage.id().to_string(),
            label: stage.label().to_string(),
            state: StepState::Pending,
        }
    }

    /// Fresh step list for a new run
    pub fn initial_steps() -> Vec<ProtocolStep> {
        StageId::ALL.iter().map(|&s| Self::pending(s)).collect()
    }
}

/// Overall status of a generation run
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunStatus {
    #[default]
    Idle,
    Generating,
    Done,
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    Log,
    Error,
    Success,
}

/// One line of the run log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: usize,
    pub message: String,
    pub kind: LogKind,
}
