pub mod error;
pub mod io;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod session;
pub mod stages;

pub use error::PipelineError;
pub use io::{
    load_source, parse_artifact, read_artifact, render_artifact, write_artifact, ArtifactError,
    DocumentStore, RenderOptions, StoreError,
};
pub use llm::{ask_document, GeminiClient, GeminiConfig, ModelError, ModelGateway};
pub use models::{
    Difficulty, GenerationConfig, ImagePayload, QuizArtifactData, QuizItem, SourceDocument,
};
pub use pipeline::{
    CancelFlag, Pipeline, PipelineEvent, PipelineInput, PipelineOptions, PipelineOutput, RunSummary,
};
pub use session::{QuizSession, SessionEvent};
