//! Zotero library mirroring.
//!
//! Summarized papers are mirrored into a Zotero library via the Web API v3:
//! one `journalArticle` item per paper with the generated summary in the
//! abstract field, plus a linked-URL attachment pointing at the PDF.
//! Mirroring is idempotent: papers already present in the library are
//! detected by arXiv id and skipped.

pub mod client;
mod item;

use thiserror::Error;

pub use client::ZoteroClient;

pub type Result<T> = std::result::Result<T, ZoteroError>;

#[derive(Debug, Error)]
pub enum ZoteroError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Zotero API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Zotero rejected item: {0}")]
    ItemRejected(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Blocked(#[from] papyra_common::PapyraError),
}
