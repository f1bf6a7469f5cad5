//! Scripted gateway shared by the stage and pipeline tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::llm::{parse_structured, ModelError, ModelGateway, ModelOutput, PromptPart};

/// Replays queued raw responses in order and records every request
pub struct ScriptedGateway {
    responses: Mutex<VecDeque<Result<String, ModelError>>>,
    calls: Mutex<Vec<Vec<PromptPart>>>,
}

impl ScriptedGateway {
    pub fn new(responses: Vec<Result<String, ModelError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Instruction text of every request, in order
    pub fn instructions(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|parts| match parts.first() {
                Some(PromptPart::Text(text)) => text.clone(),
                _ => String::new(),
            })
            .collect()
    }
}

#[async_trait]
impl ModelGateway for ScriptedGateway {
    async fn generate(
        &self,
        parts: &[PromptPart],
        schema: Option<&Value>,
    ) -> Result<ModelOutput, ModelError> {
        self.calls.lock().unwrap().push(parts.to_vec());
        let next = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ModelError::Unavailable("script exhausted".to_string())));

        let raw = next?;
        match schema {
            Some(schema) => parse_structured(&raw, schema).map(ModelOutput::Structured),
            None => Ok(ModelOutput::Text(raw)),
        }
    }
}

/// Answers each request from its own content after a per-request delay,
/// so concurrent requests finish out of order. Tracks peak overlap.
pub struct KeyedGateway<F> {
    respond: F,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl<F> KeyedGateway<F>
where
    F: Fn(&str, Option<&Value>) -> (u64, Result<String, ModelError>) + Send + Sync,
{
    /// `respond` gets the instruction and schema and returns a delay in
    /// milliseconds plus the raw response
    pub fn new(respond: F) -> Self {
        Self {
            respond,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Most requests that were awaiting a response at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<F> ModelGateway for KeyedGateway<F>
where
    F: Fn(&str, Option<&Value>) -> (u64, Result<String, ModelError>) + Send + Sync,
{
    async fn generate(
        &self,
        parts: &[PromptPart],
        schema: Option<&Value>,
    ) -> Result<ModelOutput, ModelError> {
        let instruction = match parts.first() {
            Some(PromptPart::Text(text)) => text.as_str(),
            _ => "",
        };
        let (delay_ms, next) = (self.respond)(instruction, schema);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let raw = next?;
        match schema {
            Some(schema) => parse_structured(&raw, schema).map(ModelOutput::Structured),
            None => Ok(ModelOutput::Text(raw)),
        }
    }
}

/// First `prefix-N` marker in `text` with `N < limit`; keep `limit` at 10
/// or below so markers never prefix one another
pub fn marker(text: &str, prefix: &str, limit: usize) -> Option<usize> {
    (0..limit).find(|n| text.contains(&format!("{}-{}", prefix, n)))
}
