use crate::io::ArtifactError;
use crate::llm::ModelError;
use crate::pipeline::Cancelled;

/// Failures that abort a generation run
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(
        "The model failed to generate any questions. Try adjusting the inputs or the source document."
    )]
    NoContentGenerated,

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("run cancelled")]
    Cancelled,

    #[error("failed to render quiz artifact: {0}")]
    Render(#[from] ArtifactError),
}

impl From<Cancelled> for PipelineError {
    fn from(_: Cancelled) -> Self {
        PipelineError::Cancelled
    }
}
