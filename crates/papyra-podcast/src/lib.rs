//! Podcast rendering of summarized papers.
//!
//! Each stored paper can become one episode: a spoken-style script written
//! by the LLM (falling back to the stored summary), synthesized to MP3 via
//! a TTS API, and published through an RSS feed that podcast apps can
//! subscribe to. A small axum server hands out the feed and audio files.

pub mod feed;
pub mod script;
pub mod serve;
pub mod tts;

use thiserror::Error;

pub use feed::{write_rss, Episode, FeedConfig};
pub use script::ScriptWriter;
pub use serve::{build_router, serve};
pub use tts::TtsClient;

pub type Result<T> = std::result::Result<T, PodcastError>;

#[derive(Debug, Error)]
pub enum PodcastError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TTS API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Feed generation error: {0}")]
    Feed(String),

    #[error(transparent)]
    Blocked(#[from] papyra_common::PapyraError),
}

impl From<quick_xml::Error> for PodcastError {
    fn from(err: quick_xml::Error) -> Self {
        PodcastError::Feed(err.to_string())
    }
}
