use tracing::info;

use crate::io::{render_artifact, ArtifactError, RenderOptions};
use crate::models::QuizArtifactData;

/// Result of the render stage
#[derive(Debug)]
pub struct RenderResult {
    pub html: String,
}

/// Execute the render stage
pub fn execute_render(
    data: &QuizArtifactData,
    options: &RenderOptions,
) -> Result<RenderResult, ArtifactError> {
    let html = render_artifact(data, options)?;
    info!(
        "Rendered \"{}\": {} items ({} flagged), {} KiB",
        options.display_title(),
        data.items.len(),
        data.flawed_count(),
        html.len() / 1024
    );
    Ok(RenderResult { html })
}
