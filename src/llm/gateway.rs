use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::models::ImagePayload;

/// One part of a multi-part prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptPart {
    Text(String),
    Image(ImagePayload),
}

impl PromptPart {
    pub fn text(text: impl Into<String>) -> Self {
        PromptPart::Text(text.into())
    }
}

/// What a generation call produced
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutput {
    Text(String),
    /// Already validated against the requested schema
    Structured(Value),
}

/// Gateway-level failures. Retry policy belongs to callers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// Transport, auth or upstream failure
    #[error("model unavailable: {0}")]
    Unavailable(String),
    /// Structured output missing, unparseable or not matching the schema
    #[error("model output did not match the requested format: {0}")]
    Format(String),
    #[error("model returned an empty response")]
    EmptyResponse,
}

/// Adapter over a text / structured-output generation capability
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Send `parts` to the model. With a `schema`, the result is
    /// [`ModelOutput::Structured`] and conforms to it; without one it is
    /// [`ModelOutput::Text`].
    async fn generate(
        &self,
        parts: &[PromptPart],
        schema: Option<&Value>,
    ) -> Result<ModelOutput, ModelError>;
}

/// Run a structured request and decode the result into `T`
pub async fn generate_structured<T, G>(
    gateway: &G,
    parts: &[PromptPart],
    schema: &Value,
) -> Result<T, ModelError>
where
    T: DeserializeOwned,
    G: ModelGateway + ?Sized,
{
    match gateway.generate(parts, Some(schema)).await? {
        ModelOutput::Structured(value) => {
            serde_json::from_value(value).map_err(|e| ModelError::Format(e.to_string()))
        }
        ModelOutput::Text(_) => Err(ModelError::Format(
            "expected structured output, got plain text".to_string(),
        )),
    }
}

/// Run an unstructured request
pub async fn generate_text<G>(gateway: &G, parts: &[PromptPart]) -> Result<String, ModelError>
where
    G: ModelGateway + ?Sized,
{
    match gateway.generate(parts, None).await? {
        ModelOutput::Text(text) => Ok(text),
        ModelOutput::Structured(value) => Ok(value.to_string()),
    }
}

/// Parse raw model text as JSON and check it against `schema`
pub fn parse_structured(raw: &str, schema: &Value) -> Result<Value, ModelError> {
    let trimmed = strip_code_fence(raw.trim());
    if trimmed.is_empty() {
        return Err(ModelError::EmptyResponse);
    }

    let value: Value = serde_json::from_str(trimmed)
        .map_err(|e| ModelError::Format(format!("invalid JSON: {}", e)))?;

    let validator = jsonschema::validator_for(schema)
        .map_err(|e| ModelError::Format(format!("invalid schema: {}", e)))?;
    validator
        .validate(&value)
        .map_err(|e| ModelError::Format(format!("{} at {}", e, e.instance_path)))?;

    Ok(value)
}

/// Some models wrap JSON in a markdown fence even in JSON mode
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn verdict_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "is_valid": {"type": "boolean"},
                "reason": {"type": "string"}
            },
            "required": ["is_valid", "reason"]
        })
    }

    #[test]
    fn test_parse_structured_accepts_conforming_json() {
        let value = parse_structured(r#"{"is_valid": true, "reason": "None"}"#, &verdict_schema())
            .unwrap();
        assert_eq!(value["is_valid"], json!(true));
    }

    #[test]
    fn test_parse_structured_strips_fence() {
        let raw = "```json\n{\"is_valid\": false, \"reason\": \"x\"}\n```";
        assert!(parse_structured(raw, &verdict_schema()).is_ok());
    }

    #[test]
    fn test_parse_structured_rejects_schema_mismatch() {
        let err = parse_structured(r#"{"is_valid": "yes"}"#, &verdict_schema()).unwrap_err();
        assert!(matches!(err, ModelError::Format(_)));
    }

    #[test]
    fn test_parse_structured_rejects_garbage_and_empty() {
        assert!(matches!(
            parse_structured("not json", &verdict_schema()).unwrap_err(),
            ModelError::Format(_)
        ));
        assert_eq!(
            parse_structured("   ", &verdict_schema()).unwrap_err(),
            ModelError::EmptyResponse
        );
    }
}
