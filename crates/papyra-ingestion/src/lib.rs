//! Paper discovery and ingestion.
//!
//! Finds papers on arXiv, extracts their PDF text, and drives them through
//! summarization, embedding, knowledge-base storage, and Zotero mirroring.

pub mod arxiv;
pub mod models;
pub mod pdf;
pub mod pipeline;

pub use arxiv::ArxivClient;
pub use models::{PaperMetadata, PaperSource};
pub use pdf::PdfCache;
pub use pipeline::{IngestJob, IngestResult, Pipeline};
