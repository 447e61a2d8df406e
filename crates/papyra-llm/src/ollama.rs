//! Local Ollama backend (OpenAI-compatible chat, native embeddings endpoint).

use async_trait::async_trait;
use papyra_common::SandboxClient;

use crate::{check_response_status, parse_openai_response, LlmBackend, LlmError, LlmRequest, LlmResponse};

pub struct OllamaBackend {
    pub base_url: String,
    pub model: String,
    client: SandboxClient,
}

impl OllamaBackend {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        Ok(Self {
            base_url: base_url.into(),
            model: model.into(),
            client: SandboxClient::new()?,
        })
    }
}

#[async_trait]
impl LlmBackend for OllamaBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model":       req.model.as_deref().unwrap_or(&self.model),
            "messages":    req.messages,
            "max_tokens":  req.max_tokens.unwrap_or(4096),
            "temperature": req.temperature.unwrap_or(0.1),
        });
        let resp = self.client.post(&url)?.json(&body).send().await?;
        let json = check_response_status(resp).await?;
        Ok(parse_openai_response(&json, &self.model))
    }

    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, LlmError> {
        let url = format!("{}/api/embeddings", self.base_url.trim_end_matches('/'));
        let mut out = Vec::new();
        for text in texts {
            let body = serde_json::json!({"model": &self.model, "prompt": text});
            let resp = self.client.post(&url)?.json(&body).send().await?;
            let json = check_response_status(resp).await?;
            let vec: Vec<f32> = serde_json::from_value(json["embedding"].clone())?;
            out.push(vec);
        }
        Ok(out)
    }

    fn model_id(&self) -> &str { &self.model }
    fn is_local(&self) -> bool { true }
    fn max_context_tokens(&self) -> usize { 32_768 }
    fn max_output_tokens(&self) -> usize { 8_192 }
}
