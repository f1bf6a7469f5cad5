//! Run orchestration: sequences the stages, tracks the protocol step list
//! and the run log, and maps failures onto the active step.

pub mod cancel;

pub use cancel::*;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info};

use crate::error::PipelineError;
use crate::io::RenderOptions;
use crate::llm::ModelGateway;
use crate::models::{
    GenerationConfig, ImagePayload, LogEntry, LogKind, ProtocolStep, QuizArtifactData, RunStatus,
    SourceDocument, StageId, StepState,
};
use crate::stages::{
    execute_audit, execute_generation, execute_refinement, execute_render, execute_shuffle,
    AuditConfig, ItemProgress, RefinementConfig,
};

/// Options that stay fixed for a run
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Items audited or refined at once
    pub concurrency: usize,
    pub part_index: u32,
    pub title: String,
    /// Seed for the shuffle; entropy when unset
    pub seed: Option<u64>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            part_index: 1,
            title: "Quiz".to_string(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineInput {
    pub source_text: String,
    pub images: Vec<ImagePayload>,
    pub config: GenerationConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub generated: usize,
    pub dropped: usize,
    pub passed: usize,
    pub corrected: usize,
    pub flagged: usize,
    pub refined: usize,
    pub refine_failed: usize,
}

#[derive(Debug)]
pub struct PipelineOutput {
    pub html: String,
    pub data: QuizArtifactData,
    pub summary: RunSummary,
}

/// Notifications sent to an observer while a run progresses
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    StepChanged(ProtocolStep),
    Logged(LogEntry),
    Item { stage: StageId, progress: ItemProgress },
}

type Observer<'a> = Box<dyn FnMut(&PipelineEvent) + 'a>;

/// Drives one generation run at a time against a model gateway
pub struct Pipeline<'a, G: ModelGateway + ?Sized> {
    gateway: &'a G,
    options: PipelineOptions,
    rng: StdRng,
    cancel: CancelFlag,
    steps: Vec<ProtocolStep>,
    log: Vec<LogEntry>,
    status: RunStatus,
    observer: Option<Observer<'a>>,
}

impl<'a, G: ModelGateway + ?Sized> Pipeline<'a, G> {
    pub fn new(gateway: &'a G, options: PipelineOptions) -> Self {
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            gateway,
            options,
            rng,
            cancel: CancelFlag::new(),
            steps: ProtocolStep::initial_steps(),
            log: Vec::new(),
            status: RunStatus::Idle,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: impl FnMut(&PipelineEvent) + 'a) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn steps(&self) -> &[ProtocolStep] {
        &self.steps
    }

    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    pub fn status(&self) -> &RunStatus {
        &self.status
    }

    /// Execute every stage in order.
    ///
    /// On failure the active step is marked `error`, later steps stay
    /// `pending` and the run status carries the failure message.
    pub async fn run(&mut self, input: PipelineInput) -> Result<PipelineOutput, PipelineError> {
        self.steps = ProtocolStep::initial_steps();
        self.log.clear();
        self.status = RunStatus::Generating;
        self.push_log(LogKind::Log, "Run started.");

        match self.run_stages(input).await {
            Ok(output) => {
                self.status = RunStatus::Done;
                self.push_log(
                    LogKind::Success,
                    "All stages completed. The quiz is ready to preview and download.",
                );
                Ok(output)
            }
            Err(e) => {
                let message = e.to_string();
                if let Some(stage) = self.active_stage() {
                    self.set_state(stage, StepState::Error);
                }
                error!("Run failed: {}", message);
                self.push_log(LogKind::Error, format!("Fatal error: {}", message));
                self.status = RunStatus::Error(message);
                Err(e)
            }
        }
    }

    async fn run_stages(&mut self, input: PipelineInput) -> Result<PipelineOutput, PipelineError> {
        let gateway = self.gateway;
        let cancel = self.cancel.clone();
        let mut summary = RunSummary::default();

        // p0
        self.begin(StageId::Prepare);
        cancel.check()?;
        let source = SourceDocument::new(input.source_text, input.images);
        if source.is_blank() {
            return Err(PipelineError::InvalidInput(
                "the source document is empty".to_string(),
            ));
        }
        input.config.validate().map_err(PipelineError::InvalidInput)?;
        self.complete(
            StageId::Prepare,
            format!(
                "Source prepared: {} characters, {} images.",
                source.text.chars().count(),
                source.image_count()
            ),
        );

        // p1
        self.begin(StageId::Generate);
        let generation = cancel
            .guard(execute_generation(gateway, &source, &input.config))
            .await?;
        summary.generated = generation.items.len();
        summary.dropped = generation.dropped;
        self.complete(
            StageId::Generate,
            format!(
                "Generated {} questions ({} standalone, {} cases).",
                generation.items.len(),
                generation.standalone_count,
                generation.case_count
            ),
        );

        // p2
        self.begin(StageId::Shuffle);
        cancel.check()?;
        let mut items = generation.items;
        execute_shuffle(&mut items, &mut self.rng);
        self.complete(StageId::Shuffle, "Question order shuffled.");

        // p2.8
        self.begin(StageId::AuditCorrect);
        let audit_config = AuditConfig {
            concurrency: self.options.concurrency,
        };
        let audit = {
            let mut on_item = |progress: ItemProgress| self.item_progress(StageId::AuditCorrect, progress);
            execute_audit(gateway, &source, items, &audit_config, &cancel, &mut on_item).await?
        };
        summary.passed = audit.passed;
        summary.corrected = audit.corrected;
        summary.flagged = audit.flagged;
        self.complete(
            StageId::AuditCorrect,
            format!(
                "Audit finished: {} passed, {} corrected, {} flagged.",
                audit.passed, audit.corrected, audit.flagged
            ),
        );

        // p2.7
        self.begin(StageId::RefineExplanations);
        let refine_config = RefinementConfig {
            concurrency: self.options.concurrency,
        };
        let refinement = {
            let mut on_item = |progress: ItemProgress| self.item_progress(StageId::RefineExplanations, progress);
            execute_refinement(gateway, &source, audit.items, &refine_config, &cancel, &mut on_item)
                .await?
        };
        summary.refined = refinement.refined;
        summary.refine_failed = refinement.failed;
        self.complete(
            StageId::RefineExplanations,
            format!("Refined {} flagged explanations.", refinement.refined),
        );

        // p3
        self.begin(StageId::Render);
        cancel.check()?;
        let data = QuizArtifactData::new(refinement.items, source.images);
        let render_options = RenderOptions {
            title: self.options.title.clone(),
            part_index: self.options.part_index,
            ..Default::default()
        };
        let rendered = execute_render(&data, &render_options)?;
        self.complete(StageId::Render, "Quiz document rendered.");

        // p4
        self.begin(StageId::Finalize);
        self.complete(
            StageId::Finalize,
            format!(
                "Final review: {} questions, {} in the scored quiz.",
                data.items.len(),
                data.eligible_indices().len()
            ),
        );

        Ok(PipelineOutput {
            html: rendered.html,
            data,
            summary,
        })
    }

    fn active_stage(&self) -> Option<StageId> {
        self.steps
            .iter()
            .find(|s| s.state == StepState::Active)
            .map(|s| s.stage)
    }

    fn begin(&mut self, stage: StageId) {
        info!("Starting {}", stage);
        self.set_state(stage, StepState::Active);
        self.push_log(LogKind::Log, format!("Starting {}.", stage));
    }

    fn complete(&mut self, stage: StageId, message: impl Into<String>) {
        self.set_state(stage, StepState::Done);
        self.push_log(LogKind::Success, message);
    }

    fn set_state(&mut self, stage: StageId, state: StepState) {
        let Some(step) = self.steps.iter_mut().find(|s| s.stage == stage) else {
            return;
        };
        step.state = state;
        let event = PipelineEvent::StepChanged(step.clone());
        self.emit(&event);
    }

    fn push_log(&mut self, kind: LogKind, message: impl Into<String>) {
        let entry = LogEntry {
            id: self.log.len(),
            message: message.into(),
            kind,
        };
        self.log.push(entry.clone());
        self.emit(&PipelineEvent::Logged(entry));
    }

    fn item_progress(&mut self, stage: StageId, progress: ItemProgress) {
        self.push_log(
            LogKind::Log,
            format!(
                "[{}/{}] {}: {}",
                progress.index + 1,
                progress.total,
                progress.status.as_str(),
                progress.preview
            ),
        );
        self.emit(&PipelineEvent::Item { stage, progress });
    }

    fn emit(&mut self, event: &PipelineEvent) {
        if let Some(observer) = self.observer.as_mut() {
            observer(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::parse_artifact;
    use crate::llm::ModelError;
    use crate::stages::testing::ScriptedGateway;
    use serde_json::json;

    fn input(mcq_count: u32) -> PipelineInput {
        PipelineInput {
            source_text: "The mitral valve has two leaflets.".to_string(),
            images: vec![],
            config: GenerationConfig {
                mcq_count,
                case_count: 0,
                ..Default::default()
            },
        }
    }

    fn states(pipeline: &Pipeline<'_, ScriptedGateway>) -> Vec<StepState> {
        pipeline.steps().iter().map(|s| s.state).collect()
    }

    fn options() -> PipelineOptions {
        PipelineOptions {
            seed: Some(5),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_zero_items_is_fatal_at_generation() {
        let gateway = ScriptedGateway::new(vec![Ok(
            json!({"mcqs": [], "caseScenarios": []}).to_string()
        )]);
        let mut pipeline = Pipeline::new(&gateway, options());

        let err = pipeline.run(input(2)).await.unwrap_err();

        assert!(matches!(err, PipelineError::NoContentGenerated));
        assert_eq!(
            states(&pipeline),
            vec![
                StepState::Done,
                StepState::Error,
                StepState::Pending,
                StepState::Pending,
                StepState::Pending,
                StepState::Pending,
                StepState::Pending,
            ]
        );
        assert!(matches!(pipeline.status(), RunStatus::Error(m) if m.contains("failed to generate")));
        assert_eq!(pipeline.log().last().unwrap().kind, LogKind::Error);
    }

    #[tokio::test]
    async fn test_gateway_failure_during_generation_is_fatal() {
        let gateway = ScriptedGateway::new(vec![Err(ModelError::Unavailable("401".into()))]);
        let mut pipeline = Pipeline::new(&gateway, options());

        let err = pipeline.run(input(2)).await.unwrap_err();

        assert!(matches!(err, PipelineError::Model(ModelError::Unavailable(_))));
        assert_eq!(pipeline.steps()[1].state, StepState::Error);
    }

    #[tokio::test]
    async fn test_blank_source_fails_prepare() {
        let gateway = ScriptedGateway::new(vec![]);
        let mut pipeline = Pipeline::new(&gateway, options());
        let mut blank = input(2);
        blank.source_text = "   ".to_string();

        let err = pipeline.run(blank).await.unwrap_err();

        assert!(matches!(err, PipelineError::InvalidInput(_)));
        assert_eq!(pipeline.steps()[0].state, StepState::Error);
        assert_eq!(gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_run_marks_active_step() {
        let gateway = ScriptedGateway::new(vec![]);
        let cancel = CancelFlag::new();
        cancel.cancel();
        let mut pipeline = Pipeline::new(&gateway, options()).with_cancel(cancel);

        let err = pipeline.run(input(2)).await.unwrap_err();

        assert!(matches!(err, PipelineError::Cancelled));
        assert_eq!(pipeline.steps()[0].state, StepState::Error);
    }

    #[tokio::test]
    async fn test_successful_run() {
        let item = |q: &str| {
            json!({"question": q, "options": ["a", "b", "c"], "correctAnswerIndex": 1, "explanation": "e"})
        };
        let gateway = ScriptedGateway::new(vec![
            Ok(json!({"mcqs": [item("Q1"), item("Q2")], "caseScenarios": []}).to_string()),
            Ok(json!({"is_valid": true, "reason": "", "flaw_type": "none"}).to_string()),
            Ok(json!({"is_valid": false, "reason": "bad", "flaw_type": "options"}).to_string()),
            Err(ModelError::EmptyResponse),
            Ok(json!({"new_explanation": "better"}).to_string()),
        ]);
        let mut events = Vec::new();
        let mut pipeline =
            Pipeline::new(&gateway, options()).with_observer(|e: &PipelineEvent| events.push(e.clone()));

        let output = pipeline.run(input(2)).await.unwrap();

        assert!(states(&pipeline).iter().all(|s| *s == StepState::Done));
        assert_eq!(pipeline.status(), &RunStatus::Done);
        assert_eq!(output.data.items.len(), 2);
        assert_eq!(output.data.flawed_count(), 1);
        let flawed = output.data.items.iter().find(|i| i.flawed).unwrap();
        assert_eq!(flawed.explanation, "better");
        assert_eq!(
            output.summary,
            RunSummary {
                generated: 2,
                passed: 1,
                flagged: 1,
                refined: 1,
                ..Default::default()
            }
        );
        assert_eq!(parse_artifact(&output.html).unwrap(), output.data);
        assert_eq!(gateway.call_count(), 5);

        drop(pipeline);
        let step_changes = events
            .iter()
            .filter(|e| matches!(e, PipelineEvent::StepChanged(_)))
            .count();
        assert_eq!(step_changes, 14);
        assert!(events
            .iter()
            .any(|e| matches!(e, PipelineEvent::Item { stage: StageId::AuditCorrect, .. })));
    }
}
