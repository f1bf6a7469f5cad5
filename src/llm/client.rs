use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::gateway::{parse_structured, ModelError, ModelGateway, ModelOutput, PromptPart};

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Configuration for the Gemini API client
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key (from GEMINI_API_KEY or API_KEY env var)
    pub api_key: String,
    /// Model to use (e.g., "gemini-2.5-flash")
    pub model: String,
    /// Base URL of the generative language API
    pub api_base: String,
    /// Temperature (0-2, lower = more deterministic)
    pub temperature: f64,
    /// Per-request timeout
    pub timeout: Duration,
}

impl GeminiConfig {
    /// Create config from environment variables
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("API_KEY"))
            .context("GEMINI_API_KEY (or API_KEY) environment variable not set")?;

        let mut config = Self::new(api_key, DEFAULT_MODEL.to_string());
        if let Ok(model) = std::env::var("QUIZSMITH_MODEL") {
            config.model = model;
        }
        if let Ok(base) = std::env::var("QUIZSMITH_API_BASE") {
            config.api_base = base.trim_end_matches('/').to_string();
        }
        Ok(config)
    }

    /// Create with custom settings
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key: api_key.trim().to_string(),
            model,
            api_base: DEFAULT_API_BASE.to_string(),
            temperature: 0.4,
            timeout: Duration::from_secs(300),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }
}

/// Gemini API client
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_default();
        Self { client, config }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn build_request(&self, parts: &[PromptPart], schema: Option<&Value>) -> GenerateRequest {
        let parts = parts
            .iter()
            .map(|part| match part {
                PromptPart::Text(text) => Part {
                    text: Some(text.clone()),
                    inline_data: None,
                },
                PromptPart::Image(image) => Part {
                    text: None,
                    inline_data: Some(InlineData {
                        mime_type: image.mime_type.clone(),
                        data: image.data.clone(),
                    }),
                },
            })
            .collect();

        GenerateRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts,
            }],
            generation_config: GenerationSettings {
                temperature: self.config.temperature,
                response_mime_type: schema.map(|_| "application/json".to_string()),
                response_json_schema: schema.cloned(),
            },
        }
    }
}

#[async_trait]
impl ModelGateway for GeminiClient {
    async fn generate(
        &self,
        parts: &[PromptPart],
        schema: Option<&Value>,
    ) -> Result<ModelOutput, ModelError> {
        let request = self.build_request(parts, schema);
        debug!(
            "Sending {} prompt parts to {} (structured: {})",
            parts.len(),
            self.config.model,
            schema.is_some()
        );

        let response = self
            .client
            .post(self.config.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| ModelError::Unavailable(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Unavailable(format!(
                "Gemini API error: {} - {}",
                status, body
            )));
        }

        let response: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Unavailable(format!("unreadable response envelope: {}", e)))?;

        let text = response.text();
        if text.trim().is_empty() {
            return Err(ModelError::EmptyResponse);
        }

        match schema {
            Some(schema) => parse_structured(&text, schema).map(ModelOutput::Structured),
            None => Ok(ModelOutput::Text(text)),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationSettings,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationSettings {
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_json_schema: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}
