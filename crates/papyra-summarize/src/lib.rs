//! Hierarchical document summarization.
//!
//! Turns a paper's raw extracted text into a bounded-length narrative
//! summary. Short documents go through a single generation call; long ones
//! are split into token-bounded chunks, each chunk is summarized on its own,
//! and the chunk summaries are merged into one narrative. Every summary
//! carries a method tag recording which path produced it.
//!
//! Module layout mirrors the stages:
//!
//! - [`tokens`]   — cl100k_base token counting, one scheme for every budget
//! - [`sections`] — heuristic section-header detection and reference stripping
//! - [`chunker`]  — paragraph-then-sentence greedy splitting under a budget
//! - [`summarizer`] — the strategy-selecting orchestrator

pub mod chunker;
pub mod sections;
pub mod summarizer;
pub mod tokens;

pub use chunker::chunk_text;
pub use sections::{strip_references, SectionMap, SectionName, SectionSpan};
pub use summarizer::{
    Document, SummarizeError, Summarizer, SummarizerConfig, SummaryMethod, SummaryResult,
};
pub use tokens::TokenCounter;
