pub mod stage1_generate;
pub mod stage2_shuffle;
pub mod stage3_audit;
pub mod stage4_refine;
pub mod stage5_render;

#[cfg(test)]
pub(crate) mod testing;

pub use stage1_generate::*;
pub use stage2_shuffle::*;
pub use stage3_audit::*;
pub use stage4_refine::*;
pub use stage5_render::*;

/// Per-item outcome reported while auditing or refining
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    Passed,
    Corrected,
    Flagged,
    Refined,
    RefineFailed,
    Skipped,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Passed => "passed",
            ItemStatus::Corrected => "corrected",
            ItemStatus::Flagged => "flagged",
            ItemStatus::Refined => "refined",
            ItemStatus::RefineFailed => "refinement failed",
            ItemStatus::Skipped => "skipped",
        }
    }
}

/// Progress callback payload for per-item stages
#[derive(Debug, Clone)]
pub struct ItemProgress {
    /// Zero-based position in the stage input
    pub index: usize,
    pub total: usize,
    pub preview: String,
    pub status: ItemStatus,
}
