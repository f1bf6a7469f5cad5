use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use super::{ItemProgress, ItemStatus};
use crate::error::PipelineError;
use crate::llm::schemas::{audit_schema, correction_schema};
use crate::llm::{
    build_audit_prompt, build_correction_prompt, generate_structured, with_source, ModelError,
    ModelGateway,
};
use crate::models::{AuditVerdict, CorrectionPayload, ItemError, QuizItem, SourceDocument};
use crate::pipeline::{CancelFlag, Cancelled};

/// Configuration for the audit stage
#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// Items audited at once. Each item's audit and correction always run
    /// back to back, and results keep input order.
    pub concurrency: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self { concurrency: 1 }
    }
}

/// Result of the audit stage
#[derive(Debug)]
pub struct AuditResult {
    /// Items in input order
    pub items: Vec<QuizItem>,
    pub passed: usize,
    pub corrected: usize,
    pub flagged: usize,
}

/// The audit request itself failed
#[derive(Debug, thiserror::Error)]
#[error("audit request failed: {0}")]
pub struct AuditFailure(#[from] ModelError);

/// The correction request failed or produced an unusable item
#[derive(Debug, thiserror::Error)]
pub enum CorrectionFailure {
    #[error("correction request failed: {0}")]
    Model(#[from] ModelError),
    #[error("corrected item is malformed: {0}")]
    Malformed(#[from] ItemError),
}

/// What happened to a single item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditOutcome {
    /// Judged valid, unchanged
    Passed(QuizItem),
    /// Judged invalid and replaced by the correction
    Corrected(QuizItem),
    /// Original item kept with `flawed = true`
    Flagged(QuizItem),
}

impl AuditOutcome {
    pub fn status(&self) -> ItemStatus {
        match self {
            AuditOutcome::Passed(_) => ItemStatus::Passed,
            AuditOutcome::Corrected(_) => ItemStatus::Corrected,
            AuditOutcome::Flagged(_) => ItemStatus::Flagged,
        }
    }

    pub fn into_item(self) -> QuizItem {
        match self {
            AuditOutcome::Passed(item)
            | AuditOutcome::Corrected(item)
            | AuditOutcome::Flagged(item) => item,
        }
    }
}

/// Execute the audit and correction stage
///
/// For each item:
/// 1. Ask the auditor for a verdict against the source
/// 2. If rejected, ask once for a complete corrected item
/// 3. If correction fails, keep the original and flag it
///
/// Per-item failures never abort the stage; only cancellation does.
pub async fn execute_audit<G>(
    gateway: &G,
    source: &SourceDocument,
    items: Vec<QuizItem>,
    config: &AuditConfig,
    cancel: &CancelFlag,
    progress: &mut dyn FnMut(ItemProgress),
) -> Result<AuditResult, PipelineError>
where
    G: ModelGateway + ?Sized,
{
    let total = items.len();
    let concurrency = config.concurrency.max(1);
    info!("Auditing {} items ({} in flight)", total, concurrency);

    let mut outcomes = stream::iter(items.into_iter().enumerate())
        .map(|(index, item)| async move {
            let preview = item.preview(50);
            debug!("Auditing item {}/{}: {}", index + 1, total, preview);
            let outcome = cancel
                .guard(async { Ok::<_, Cancelled>(audit_item(gateway, source, item).await) })
                .await?;
            Ok::<_, Cancelled>((index, preview, outcome))
        })
        .buffered(concurrency);

    let mut result = AuditResult {
        items: Vec::with_capacity(total),
        passed: 0,
        corrected: 0,
        flagged: 0,
    };

    while let Some(next) = outcomes.next().await {
        let (index, preview, outcome) = next?;
        let status = outcome.status();
        match status {
            ItemStatus::Passed => result.passed += 1,
            ItemStatus::Corrected => result.corrected += 1,
            _ => result.flagged += 1,
        }
        progress(ItemProgress {
            index,
            total,
            preview,
            status,
        });
        result.items.push(outcome.into_item());
    }

    info!(
        "Audit: {} passed, {} corrected, {} flagged",
        result.passed, result.corrected, result.flagged
    );

    Ok(result)
}

/// Audit one item, correcting or flagging it as needed
pub async fn audit_item<G>(gateway: &G, source: &SourceDocument, mut item: QuizItem) -> AuditOutcome
where
    G: ModelGateway + ?Sized,
{
    let verdict = match request_verdict(gateway, source, &item).await {
        Ok(verdict) => verdict,
        Err(e) => {
            warn!("{}; flagging item", e);
            return AuditOutcome::Flagged(item.flagged());
        }
    };

    if verdict.is_valid {
        item.flawed = false;
        return AuditOutcome::Passed(item);
    }

    debug!(
        "Auditor rejected item ({}): {}",
        verdict.flaw_type.as_str(),
        verdict.reason
    );

    match request_correction(gateway, source, &item, &verdict).await {
        Ok(corrected) => AuditOutcome::Corrected(corrected),
        Err(e) => {
            warn!("{}; keeping original item as flawed", e);
            AuditOutcome::Flagged(item.flagged())
        }
    }
}

async fn request_verdict<G>(
    gateway: &G,
    source: &SourceDocument,
    item: &QuizItem,
) -> Result<AuditVerdict, AuditFailure>
where
    G: ModelGateway + ?Sized,
{
    let parts = with_source(build_audit_prompt(item), source);
    Ok(generate_structured(gateway, &parts, &audit_schema()).await?)
}

async fn request_correction<G>(
    gateway: &G,
    source: &SourceDocument,
    item: &QuizItem,
    verdict: &AuditVerdict,
) -> Result<QuizItem, CorrectionFailure>
where
    G: ModelGateway + ?Sized,
{
    let parts = with_source(build_correction_prompt(item, verdict), source);
    let payload: CorrectionPayload =
        generate_structured(gateway, &parts, &correction_schema()).await?;

    let mut corrected = payload.corrected_question.into_item(source.image_count())?;
    corrected.case_text = item.case_text.clone();
    corrected.flawed = false;
    Ok(corrected)
}
