use tracing::{info, warn};

use crate::error::PipelineError;
use crate::llm::schemas::generation_schema;
use crate::llm::{build_generation_prompt, generate_structured, with_source, ModelGateway};
use crate::models::{
    CaseGroup, GenerationConfig, GenerationPayload, ItemPayload, QuizItem, SourceDocument,
};

/// Result of the generation stage
#[derive(Debug)]
pub struct GenerationResult {
    /// Standalone items followed by flattened case items, unshuffled
    pub items: Vec<QuizItem>,
    pub standalone_count: usize,
    pub case_count: usize,
    /// Items dropped because the model returned them malformed
    pub dropped: usize,
}

/// Execute the generation stage
///
/// One combined request asks for every standalone question and every case
/// scenario. Case items are flattened into the pool with their case text.
/// An empty pool is fatal; any gateway error propagates unchanged.
pub async fn execute_generation<G>(
    gateway: &G,
    source: &SourceDocument,
    config: &GenerationConfig,
) -> Result<GenerationResult, PipelineError>
where
    G: ModelGateway + ?Sized,
{
    let prompt = build_generation_prompt(config, source.image_count());
    let parts = with_source(prompt, source);
    let schema = generation_schema(config.questions_per_case);

    info!(
        "Requesting {} standalone questions and {} cases x {} questions",
        config.mcq_count, config.case_count, config.questions_per_case
    );
    let payload: GenerationPayload = generate_structured(gateway, &parts, &schema).await?;

    let image_count = source.image_count();
    let mut dropped = 0;

    let mut items = accept_items(payload.mcqs, image_count, &mut dropped);
    let standalone_count = items.len();

    let mut case_count = 0;
    for scenario in payload.case_scenarios {
        let group = CaseGroup {
            case_text: scenario.case_text,
            items: accept_items(scenario.items, image_count, &mut dropped),
        };
        if !group.items.is_empty() {
            case_count += 1;
        }
        items.extend(group.flatten());
    }

    if dropped > 0 {
        warn!("Dropped {} malformed generated items", dropped);
    }

    if items.is_empty() {
        return Err(PipelineError::NoContentGenerated);
    }

    if items.len() != config.expected_items() {
        warn!(
            "Model returned {} items, expected {}",
            items.len(),
            config.expected_items()
        );
    }

    Ok(GenerationResult {
        items,
        standalone_count,
        case_count,
        dropped,
    })
}

fn accept_items(payloads: Vec<ItemPayload>, image_count: usize, dropped: &mut usize) -> Vec<QuizItem> {
    payloads
        .into_iter()
        .filter_map(|payload| match payload.into_item(image_count) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!("Skipping generated item: {}", e);
                *dropped += 1;
                None
            }
        })
        .collect()
}
