use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Mutex;

use quizsmith::llm::{ModelOutput, PromptPart};
use quizsmith::models::StepState;
use quizsmith::session::{Page, SessionEvent, SUCCESS_MESSAGES};
use quizsmith::{
    parse_artifact, read_artifact, write_artifact, GenerationConfig, ModelError, ModelGateway,
    Pipeline, PipelineInput, PipelineOptions, QuizSession,
};

/// Answers by request kind, judged from the requested output shape, so the
/// shuffled processing order does not matter.
struct FakeGateway {
    calls: Mutex<Vec<String>>,
}

impl FakeGateway {
    fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self, kind: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|k| *k == kind).count()
    }
}

fn item(question: &str, correct: usize) -> Value {
    json!({
        "question": question,
        "options": ["`tick` option", "${dollar} option", "</script> option", r"C:\path option"],
        "correctAnswerIndex": correct,
        "explanation": format!("Because \"{}\" says so.", question),
        "imageIndex": null
    })
}

#[async_trait]
impl ModelGateway for FakeGateway {
    async fn generate(
        &self,
        parts: &[PromptPart],
        schema: Option<&Value>,
    ) -> Result<ModelOutput, ModelError> {
        let instruction = match parts.first() {
            Some(PromptPart::Text(text)) => text.clone(),
            _ => String::new(),
        };
        let properties = schema
            .and_then(|s| s.get("properties"))
            .cloned()
            .unwrap_or(Value::Null);

        let kind = if properties.get("mcqs").is_some() {
            "generate"
        } else if properties.get("is_valid").is_some() {
            "audit"
        } else if properties.get("corrected_question").is_some() {
            "correct"
        } else if properties.get("new_explanation").is_some() {
            "refine"
        } else {
            "text"
        };
        self.calls.lock().unwrap().push(kind.to_string());

        let value = match kind {
            "generate" => json!({
                "mcqs": [item("Plain one", 0), item("BROKEN-FIX two", 1), item("BROKEN-HOPELESS three", 2)],
                "caseScenarios": [{
                    "caseText": "A 54-year-old with `chest pain` and ${vitals}",
                    "items": [item("Case first", 3), item("Case second", 0)]
                }]
            }),
            "audit" if instruction.contains("BROKEN") => {
                json!({"is_valid": false, "reason": "ambiguous stem", "flaw_type": "question"})
            }
            "audit" => json!({"is_valid": true, "reason": "None", "flaw_type": "none"}),
            "correct" if instruction.contains("HOPELESS") => {
                return Err(ModelError::Format("truncated JSON".to_string()));
            }
            "correct" => json!({"corrected_question": item("Fixed two", 1)}),
            "refine" => json!({"new_explanation": "Rewritten with `care` and $5 of detail."}),
            _ => return Ok(ModelOutput::Text("Not found in the document.".to_string())),
        };
        Ok(ModelOutput::Structured(value))
    }
}

#[tokio::test]
async fn test_full_run_renders_a_playable_artifact() {
    let gateway = FakeGateway::new();
    let options = PipelineOptions {
        title: "Cardiology `Basics`".to_string(),
        part_index: 2,
        seed: Some(17),
        ..Default::default()
    };
    let mut pipeline = Pipeline::new(&gateway, options);

    let output = pipeline
        .run(PipelineInput {
            source_text: "Chest pain notes.".to_string(),
            images: vec![],
            config: GenerationConfig {
                mcq_count: 3,
                case_count: 1,
                questions_per_case: 2,
                ..Default::default()
            },
        })
        .await
        .unwrap();

    assert!(pipeline.steps().iter().all(|s| s.state == StepState::Done));
    assert_eq!(gateway.calls("generate"), 1);
    assert_eq!(gateway.calls("audit"), 5);
    assert_eq!(gateway.calls("correct"), 2);
    assert_eq!(gateway.calls("refine"), 1);

    let data = &output.data;
    assert_eq!(data.items.len(), 5);
    assert_eq!(data.flawed_count(), 1);
    assert_eq!(data.case_count(), 1);
    assert!(data.items.iter().any(|i| i.prompt == "Fixed two" && !i.flawed));
    let hopeless = data.items.iter().find(|i| i.flawed).unwrap();
    assert_eq!(hopeless.prompt, "BROKEN-HOPELESS three");
    assert_eq!(hopeless.explanation, "Rewritten with `care` and $5 of detail.");

    // The embedded data survives the trip through disk unchanged
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quiz.html");
    write_artifact(&path, &output.html).unwrap();
    let (title, parsed) = read_artifact(&path).unwrap();
    assert_eq!(title, "Cardiology `Basics` (Part 2)");
    assert_eq!(&parsed, data);
    assert_eq!(parse_artifact(&output.html).unwrap(), parsed);

    // Take the quiz, answering every scored item correctly
    let mut session = QuizSession::new(parsed.clone(), Some(1));
    session.dispatch(SessionEvent::Start);
    let eligible = parsed.eligible_indices();
    assert_eq!(eligible.len(), 4);
    for (position, index) in eligible.iter().enumerate() {
        assert_eq!(session.state().page, Page::Taking { position });
        session.dispatch(SessionEvent::Select(parsed.items[*index].correct_index));
        if position + 1 < eligible.len() {
            session.dispatch(SessionEvent::Next);
        }
    }
    session.dispatch(SessionEvent::Finish);

    assert_eq!(session.state().page, Page::Results);
    let score = session.score();
    assert_eq!((score.correct, score.eligible), (4, 4));
    assert_eq!(score.formatted_percent(), "100.0%");
    assert!(SUCCESS_MESSAGES.contains(&session.state().message.as_deref().unwrap()));

    session.dispatch(SessionEvent::Home);
    session.dispatch(SessionEvent::OpenReference);
    let reference = session.render(&title);
    assert!(reference.contains("BROKEN-HOPELESS three"));
    assert!(reference.contains("under review"));
}
