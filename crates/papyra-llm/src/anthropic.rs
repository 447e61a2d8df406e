//! Anthropic Messages API backend (claude-*).

use async_trait::async_trait;
use papyra_common::SandboxClient;

use crate::{check_response_status, LlmBackend, LlmError, LlmRequest, LlmResponse};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicBackend {
    pub model: String,
    api_key: String,
    client: SandboxClient,
}

impl AnthropicBackend {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        Ok(Self {
            api_key: api_key.into(),
            model: model.into(),
            client: SandboxClient::new()?,
        })
    }
}

#[async_trait]
impl LlmBackend for AnthropicBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        // Messages API wants the system prompt split out of the message list
        let system = req
            .messages
            .iter()
            .find(|m| m.role == "system")
            .map(|m| m.content.as_str())
            .unwrap_or("");

        let messages: Vec<serde_json::Value> = req
            .messages
            .iter()
            .filter(|m| m.role != "system")
            .map(|m| serde_json::json!({"role": m.role, "content": m.content}))
            .collect();

        let model = req.model.as_deref().unwrap_or(&self.model);

        let mut body = serde_json::json!({
            "model":      model,
            "messages":   messages,
            "max_tokens": req.max_tokens.unwrap_or(4096),
        });
        if !system.is_empty() {
            body["system"] = serde_json::Value::String(system.to_string());
        }
        if let Some(t) = req.temperature {
            body["temperature"] = serde_json::json!(t);
        }

        let resp = self
            .client
            .post(MESSAGES_URL)?
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let json = check_response_status(resp).await?;

        let content = json["content"]
            .as_array()
            .and_then(|blocks| blocks.first())
            .and_then(|b| b["text"].as_str())
            .unwrap_or("")
            .to_string();

        Ok(LlmResponse {
            content,
            model: json["model"].as_str().unwrap_or(model).to_string(),
            prompt_tokens: json["usage"]["input_tokens"].as_u64().unwrap_or(0) as u32,
            completion_tokens: json["usage"]["output_tokens"].as_u64().unwrap_or(0) as u32,
        })
    }

    /// Anthropic does not offer an embeddings API; raise an error.
    async fn embed(&self, _texts: Vec<String>) -> Result<Vec<Vec<f32>>, LlmError> {
        Err(LlmError::Unavailable(
            "Anthropic does not provide an embeddings API. \
             Use OpenAI text-embedding-3-* or a local model for embeddings."
                .to_string(),
        ))
    }

    fn model_id(&self) -> &str { &self.model }
    fn is_local(&self) -> bool { false }
    fn max_context_tokens(&self) -> usize { 200_000 }
    fn max_output_tokens(&self) -> usize { 8_192 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anthropic_backend_is_not_local() {
        let b = AnthropicBackend::new("sk-ant-test", "claude-sonnet-4-20250514").unwrap();
        assert!(!b.is_local());
        assert_eq!(b.model_id(), "claude-sonnet-4-20250514");
    }

    #[tokio::test]
    async fn test_anthropic_embed_is_unavailable() {
        let b = AnthropicBackend::new("sk-ant-test", "claude-sonnet-4-20250514").unwrap();
        let err = b.embed(vec!["text".to_string()]).await.unwrap_err();
        assert!(matches!(err, LlmError::Unavailable(_)));
    }
}
