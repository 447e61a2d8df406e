//! Text-to-speech synthesis via the OpenAI audio API.
//!
//! Endpoint used:
//!   speech: POST https://api.openai.com/v1/audio/speech
//!
//! The API caps input at 4096 characters per request, so long scripts are
//! split into chunks and the returned MP3 segments are concatenated. MP3
//! frames are self-contained, so byte-level concatenation plays correctly.

use std::path::Path;

use serde_json::json;
use tracing::{debug, instrument};

use papyra_common::SandboxClient;

use crate::{PodcastError, Result};

const SPEECH_URL: &str = "https://api.openai.com/v1/audio/speech";

/// Character budget per request, kept under the API's 4096 limit.
const CHUNK_CHARS: usize = 4_000;

pub struct TtsClient {
    client: SandboxClient,
    api_key: String,
    model: String,
    voice: String,
}

impl TtsClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: SandboxClient::new()?,
            api_key: api_key.into(),
            model: "tts-1".to_string(),
            voice: "alloy".to_string(),
        })
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }

    /// Synthesize a script to an MP3 file at `out_path`.
    #[instrument(skip(self, text), fields(chars = text.len()))]
    pub async fn synthesize(&self, text: &str, out_path: &Path) -> Result<()> {
        let mut audio = Vec::new();
        for chunk in split_text(text, CHUNK_CHARS) {
            audio.extend_from_slice(&self.speech_request(chunk).await?);
        }

        tokio::fs::write(out_path, &audio).await?;
        debug!(path = %out_path.display(), bytes = audio.len(), "wrote episode audio");
        Ok(())
    }

    async fn speech_request(&self, input: &str) -> Result<Vec<u8>> {
        let resp = self
            .client
            .post(SPEECH_URL)?
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "voice": self.voice,
                "input": input,
            }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PodcastError::Api {
                status: status.as_u16(),
                message: resp.text().await.unwrap_or_default(),
            });
        }

        Ok(resp.bytes().await?.to_vec())
    }
}

/// Split text into chunks of at most `max_chars`, preferring sentence
/// boundaries and falling back to char boundaries for unbroken runs.
fn split_text(text: &str, max_chars: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = text;

    while rest.len() > max_chars {
        let window = &rest[..floor_char_boundary(rest, max_chars)];
        let cut = window
            .rfind(['.', '!', '?'])
            .map(|p| p + 1)
            .unwrap_or(window.len());
        let (head, tail) = rest.split_at(cut);
        chunks.push(head);
        rest = tail.trim_start();
    }

    if !rest.is_empty() {
        chunks.push(rest);
    }
    chunks
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    while !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_one_chunk() {
        assert_eq!(split_text("Hello world.", 4000), vec!["Hello world."]);
    }

    #[test]
    fn test_long_text_splits_on_sentences() {
        let text = "First sentence. Second sentence. Third sentence.";
        let chunks = split_text(text, 20);
        assert!(chunks.len() >= 2);
        assert!(chunks.iter().all(|c| c.len() <= 20));
        let without_ws = |s: &str| s.chars().filter(|c| !c.is_whitespace()).collect::<String>();
        assert_eq!(without_ws(&chunks.concat()), without_ws(text));
    }

    #[test]
    fn test_unbroken_run_still_splits() {
        let text = "a".repeat(50);
        let chunks = split_text(&text, 20);
        assert!(chunks.iter().all(|c| c.len() <= 20));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_multibyte_safe() {
        let text = "ü".repeat(30);
        let chunks = split_text(&text, 7);
        assert_eq!(chunks.concat(), text);
    }
}
