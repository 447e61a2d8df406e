//! Stored paper records and identifiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use papyra_summarize::SectionMap;

use crate::error::Result;

pub const TABLE_PAPERS: &str = "papers";

/// Embedding dimension (text-embedding-3-small outputs 1536-dim vectors)
pub const EMBEDDING_DIM: usize = 1536;

/// One summarized paper as stored in the knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperRecord {
    /// Stable content id, derived from the source identifier via [`doc_id`].
    pub id: String,
    pub arxiv_id: String,
    pub title: String,
    /// Authors joined with "; ".
    pub authors: String,
    pub abstract_text: String,
    pub summary: String,
    /// Tag of the strategy that produced the summary, e.g.
    /// `full_text_single_pass` or `hierarchical_4_chunks`.
    pub summary_method: String,
    /// JSON array of detected section names, if any were found.
    pub sections: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub pdf_url: Option<String>,
    pub ingested_at: DateTime<Utc>,
    pub embedding: Option<Vec<f32>>,
}

/// Deterministic record id for a source identifier. Re-ingesting the same
/// paper always maps to the same row.
pub fn doc_id(source_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_id.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Serialize the detected section names for storage.
pub fn sections_json(map: &SectionMap) -> Result<Option<String>> {
    if map.is_empty() {
        return Ok(None);
    }
    let names: Vec<&str> = map.names().iter().map(|n| n.as_str()).collect();
    Ok(Some(serde_json::to_string(&names)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_id_is_stable() {
        assert_eq!(doc_id("2401.12345"), doc_id("2401.12345"));
        assert_ne!(doc_id("2401.12345"), doc_id("2401.12346"));
        // hex sha-256
        assert_eq!(doc_id("x").len(), 64);
    }

    #[test]
    fn test_sections_json_empty_map() {
        assert_eq!(sections_json(&SectionMap::default()).unwrap(), None);
    }

    #[test]
    fn test_sections_json_lists_names() {
        let map = SectionMap::detect("\nIntroduction\nbody\n\nConclusion\nend\n");
        let json = sections_json(&map).unwrap().unwrap();
        assert!(json.contains("introduction"));
        assert!(json.contains("conclusion"));
    }
}
