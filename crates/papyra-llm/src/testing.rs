//! Deterministic scripted backend for tests.
//!
//! Replies are played back in the order they were queued; once the script is
//! exhausted every further call returns a generic reply. Recorded requests
//! let tests assert on call counts and prompt contents.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::{LlmBackend, LlmError, LlmRequest, LlmResponse};

#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Text(String),
    Fail(String),
}

impl ScriptedReply {
    pub fn text(s: impl Into<String>) -> Self {
        ScriptedReply::Text(s.into())
    }

    pub fn fail(s: impl Into<String>) -> Self {
        ScriptedReply::Fail(s.into())
    }
}

pub struct ScriptedBackend {
    replies: Mutex<std::collections::VecDeque<ScriptedReply>>,
    calls: Mutex<Vec<LlmRequest>>,
    embedding_dim: usize,
    fail_embeddings: bool,
}

impl ScriptedBackend {
    /// Backend that answers every call with a generic reply.
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(std::collections::VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            embedding_dim: 1536,
            fail_embeddings: false,
        }
    }

    /// Backend that plays back `replies` in order.
    pub fn with_script(replies: Vec<ScriptedReply>) -> Self {
        let b = Self::new();
        *b.replies.lock().unwrap() = replies.into();
        b
    }

    pub fn with_embedding_dim(mut self, dim: usize) -> Self {
        self.embedding_dim = dim;
        self
    }

    pub fn failing_embeddings(mut self) -> Self {
        self.fail_embeddings = true;
        self
    }

    /// Requests seen so far, in call order.
    pub fn recorded_calls(&self) -> Vec<LlmRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        self.calls.lock().unwrap().push(req);
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(ScriptedReply::Fail(msg)) => Err(LlmError::Unavailable(msg)),
            Some(ScriptedReply::Text(content)) => Ok(LlmResponse {
                content,
                model: "scripted".to_string(),
                prompt_tokens: 0,
                completion_tokens: 0,
            }),
            None => Ok(LlmResponse {
                content: "scripted reply".to_string(),
                model: "scripted".to_string(),
                prompt_tokens: 0,
                completion_tokens: 0,
            }),
        }
    }

    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, LlmError> {
        if self.fail_embeddings {
            return Err(LlmError::Unavailable("scripted embedding failure".to_string()));
        }
        // Length-derived vectors keep distinct texts distinguishable in tests
        Ok(texts
            .iter()
            .map(|t| {
                let mut v = vec![0.0_f32; self.embedding_dim];
                if !v.is_empty() {
                    v[0] = t.len() as f32;
                }
                v
            })
            .collect())
    }

    fn model_id(&self) -> &str { "scripted" }
    fn is_local(&self) -> bool { true }
    fn max_context_tokens(&self) -> usize { usize::MAX }
    fn max_output_tokens(&self) -> usize { usize::MAX }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_plays_back_in_order() {
        let b = ScriptedBackend::with_script(vec![
            ScriptedReply::text("first"),
            ScriptedReply::fail("boom"),
        ]);

        let r1 = b.complete(LlmRequest::prompt("a", 100)).await.unwrap();
        assert_eq!(r1.content, "first");

        let r2 = b.complete(LlmRequest::prompt("b", 100)).await;
        assert!(r2.is_err());

        // Exhausted script falls through to the generic reply
        let r3 = b.complete(LlmRequest::prompt("c", 100)).await.unwrap();
        assert_eq!(r3.content, "scripted reply");

        assert_eq!(b.call_count(), 3);
    }

    #[tokio::test]
    async fn test_embeddings_have_requested_dim() {
        let b = ScriptedBackend::new().with_embedding_dim(8);
        let vecs = b.embed(vec!["hello".to_string()]).await.unwrap();
        assert_eq!(vecs.len(), 1);
        assert_eq!(vecs[0].len(), 8);
    }
}
