//! OpenAI backend: chat completions plus text-embedding-3-* embeddings.

use async_trait::async_trait;
use papyra_common::SandboxClient;

use crate::{check_response_status, parse_openai_response, LlmBackend, LlmError, LlmRequest, LlmResponse};

const CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";

pub struct OpenAiBackend {
    pub model: String,
    pub embedding_model: String,
    api_key: String,
    client: SandboxClient,
}

impl OpenAiBackend {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        Ok(Self {
            model: model.into(),
            embedding_model: "text-embedding-3-small".to_string(),
            api_key: api_key.into(),
            client: SandboxClient::new()?,
        })
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let body = serde_json::json!({
            "model":       req.model.as_deref().unwrap_or(&self.model),
            "messages":    req.messages,
            "max_tokens":  req.max_tokens.unwrap_or(4096),
            "temperature": req.temperature.unwrap_or(0.1),
        });
        let resp = self
            .client
            .post(CHAT_URL)?
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let json = check_response_status(resp).await?;
        Ok(parse_openai_response(&json, &self.model))
    }

    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, LlmError> {
        let body = serde_json::json!({
            "model": &self.embedding_model,
            "input": texts,
        });
        let resp = self
            .client
            .post(EMBEDDINGS_URL)?
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let json = check_response_status(resp).await?;
        let embeddings: Vec<Vec<f32>> = json["data"]
            .as_array()
            .unwrap_or(&vec![])
            .iter()
            .map(|item| serde_json::from_value(item["embedding"].clone()).unwrap_or_default())
            .collect();
        Ok(embeddings)
    }

    fn model_id(&self) -> &str { &self.model }
    fn is_local(&self) -> bool { false }
    fn max_context_tokens(&self) -> usize { 128_000 }
    fn max_output_tokens(&self) -> usize { 16_384 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_backend_is_not_local() {
        let b = OpenAiBackend::new("sk-test", "gpt-4o").unwrap();
        assert!(!b.is_local());
        assert_eq!(b.model_id(), "gpt-4o");
    }

    #[test]
    fn test_openai_embedding_model_override() {
        let b = OpenAiBackend::new("sk-test", "gpt-4o")
            .unwrap()
            .with_embedding_model("text-embedding-3-large");
        assert_eq!(b.embedding_model, "text-embedding-3-large");
    }
}
