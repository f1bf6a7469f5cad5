use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use super::{ItemProgress, ItemStatus};
use crate::error::PipelineError;
use crate::llm::schemas::refinement_schema;
use crate::llm::{build_refinement_prompt, generate_structured, with_source, ModelError, ModelGateway};
use crate::models::{QuizItem, RefinementPayload, SourceDocument};
use crate::pipeline::{CancelFlag, Cancelled};

/// Configuration for the explanation refinement stage
#[derive(Debug, Clone)]
pub struct RefinementConfig {
    /// Flagged items refined at once; results keep input order
    pub concurrency: usize,
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self { concurrency: 1 }
    }
}

/// Result of the refinement stage
#[derive(Debug)]
pub struct RefinementResult {
    pub items: Vec<QuizItem>,
    /// Flagged items whose explanation was rewritten
    pub refined: usize,
    /// Flagged items left as they were after a failed rewrite
    pub failed: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum RefinementFailure {
    #[error("refinement request failed: {0}")]
    Model(#[from] ModelError),
    #[error("model returned an empty explanation")]
    EmptyExplanation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefineOutcome {
    /// Explanation replaced; still flagged
    Refined(QuizItem),
    /// Rewrite failed, item unchanged
    Failed(QuizItem),
    /// Not flagged, never sent to the model
    Untouched(QuizItem),
}

impl RefineOutcome {
    pub fn status(&self) -> ItemStatus {
        match self {
            RefineOutcome::Refined(_) => ItemStatus::Refined,
            RefineOutcome::Failed(_) => ItemStatus::RefineFailed,
            RefineOutcome::Untouched(_) => ItemStatus::Skipped,
        }
    }

    pub fn into_item(self) -> QuizItem {
        match self {
            RefineOutcome::Refined(item)
            | RefineOutcome::Failed(item)
            | RefineOutcome::Untouched(item) => item,
        }
    }
}

/// Execute the explanation refinement stage
///
/// Only items flagged by the audit are sent to the model, and only their
/// explanation may change. The flaw flag is left set.
pub async fn execute_refinement<G>(
    gateway: &G,
    source: &SourceDocument,
    items: Vec<QuizItem>,
    config: &RefinementConfig,
    cancel: &CancelFlag,
    progress: &mut dyn FnMut(ItemProgress),
) -> Result<RefinementResult, PipelineError>
where
    G: ModelGateway + ?Sized,
{
    let total = items.len();
    let flagged = items.iter().filter(|i| i.flawed).count();
    info!("Refining explanations for {} of {} items", flagged, total);

    let mut outcomes = stream::iter(items.into_iter().enumerate())
        .map(|(index, item)| async move {
            let preview = item.preview(50);
            let outcome = cancel
                .guard(async { Ok::<_, Cancelled>(refine_item(gateway, source, item).await) })
                .await?;
            Ok::<_, Cancelled>((index, preview, outcome))
        })
        .buffered(config.concurrency.max(1));

    let mut result = RefinementResult {
        items: Vec::with_capacity(total),
        refined: 0,
        failed: 0,
    };

    while let Some(next) = outcomes.next().await {
        let (index, preview, outcome) = next?;
        let status = outcome.status();
        match status {
            ItemStatus::Refined => result.refined += 1,
            ItemStatus::RefineFailed => result.failed += 1,
            _ => {}
        }
        progress(ItemProgress {
            index,
            total,
            preview,
            status,
        });
        result.items.push(outcome.into_item());
    }

    Ok(result)
}

/// Rewrite the explanation of a flagged item; anything else passes through
pub async fn refine_item<G>(gateway: &G, source: &SourceDocument, mut item: QuizItem) -> RefineOutcome
where
    G: ModelGateway + ?Sized,
{
    if !item.flawed {
        return RefineOutcome::Untouched(item);
    }

    debug!("Refining explanation: {}", item.preview(50));
    match request_explanation(gateway, source, &item).await {
        Ok(explanation) => {
            item.explanation = explanation;
            RefineOutcome::Refined(item)
        }
        Err(e) => {
            warn!("{}; keeping current explanation", e);
            RefineOutcome::Failed(item)
        }
    }
}

async fn request_explanation<G>(
    gateway: &G,
    source: &SourceDocument,
    item: &QuizItem,
) -> Result<String, RefinementFailure>
where
    G: ModelGateway + ?Sized,
{
    let parts = with_source(build_refinement_prompt(item), source);
    let payload: RefinementPayload =
        generate_structured(gateway, &parts, &refinement_schema()).await?;

    let explanation = payload.new_explanation.trim();
    if explanation.is_empty() {
        return Err(RefinementFailure::EmptyExplanation);
    }
    Ok(explanation.to_string())
}
