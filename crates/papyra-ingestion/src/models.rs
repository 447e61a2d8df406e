//! Data models for the ingestion pipeline.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A discovered paper before summarization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperMetadata {
    /// arXiv identifier without the version suffix, e.g. "2401.00001".
    pub arxiv_id: String,
    pub title: String,
    pub abstract_text: String,
    pub authors: Vec<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub pdf_url: Option<String>,
    pub categories: Vec<String>,
}

impl PaperMetadata {
    pub fn authors_joined(&self) -> String {
        self.authors.join("; ")
    }
}

/// Common interface for paper discovery clients.
#[async_trait]
pub trait PaperSource: Send + Sync {
    /// Search for papers matching a query, newest first.
    async fn search(&self, query: &str, max_results: usize) -> anyhow::Result<Vec<PaperMetadata>>;

    /// Fetch metadata for specific identifiers.
    async fn fetch_by_ids(&self, ids: &[String]) -> anyhow::Result<Vec<PaperMetadata>>;
}
