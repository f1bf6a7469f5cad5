use tracing::info;

use super::{build_answer_prompt, generate_text, ModelError, ModelGateway, PromptPart};

/// Answer a free-form question using only the given document
pub async fn ask_document<G>(gateway: &G, document: &str, question: &str) -> Result<String, ModelError>
where
    G: ModelGateway + ?Sized,
{
    info!("Asking about document ({} chars)", document.len());
    let parts = [PromptPart::Text(build_answer_prompt(document, question))];
    let answer = generate_text(gateway, &parts).await?;
    if answer.trim().is_empty() {
        return Err(ModelError::EmptyResponse);
    }
    Ok(answer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ModelOutput;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::Mutex;

    struct EchoGateway {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ModelGateway for EchoGateway {
        async fn generate(
            &self,
            parts: &[PromptPart],
            schema: Option<&Value>,
        ) -> Result<ModelOutput, ModelError> {
            assert!(schema.is_none());
            if let Some(PromptPart::Text(text)) = parts.first() {
                self.seen.lock().unwrap().push(text.clone());
            }
            Ok(ModelOutput::Text("The dose is 5 mg.".to_string()))
        }
    }

    #[tokio::test]
    async fn test_ask_document_uses_text_mode() {
        let gateway = EchoGateway {
            seen: Mutex::new(Vec::new()),
        };
        let answer = ask_document(&gateway, "Give 5 mg daily.", "What is the dose?")
            .await
            .unwrap();
        assert_eq!(answer, "The dose is 5 mg.");

        let seen = gateway.seen.lock().unwrap();
        assert!(seen[0].contains("Give 5 mg daily."));
        assert!(seen[0].contains("QUESTION: \"What is the dose?\""));
    }
}
