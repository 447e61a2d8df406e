//! Strategy-selecting summarization orchestrator.
//!
//! Flow for one document: fall back to the abstract when no text was
//! extracted; otherwise detect sections, strip the bibliography, count
//! tokens, and pick a path:
//!
//! - below the threshold: one generation call over the full remaining text.
//!   A failure here propagates as an error, since no partial results exist
//!   to degrade to.
//! - at or above the threshold: chunk, summarize each chunk in order, merge.
//!   Chunk and merge failures degrade locally (raw excerpt / verbatim
//!   concatenation) and never abort the document.
//!
//! Processing is sequential per document and stateless between documents.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use papyra_llm::{LlmBackend, LlmError, LlmRequest};

use crate::chunker::chunk_text;
use crate::sections::{strip_references, SectionMap};
use crate::tokens::TokenCounter;

/// Token count below which the whole text goes into one generation call.
pub const SINGLE_PASS_THRESHOLD: usize = 50_000;

/// Per-chunk token budget for hierarchical summarization.
pub const CHUNK_MAX_TOKENS: usize = 15_000;

/// Characters of raw chunk text used when a chunk-level generation fails.
const EXCERPT_FALLBACK_CHARS: usize = 500;

// ── Inputs / outputs ──────────────────────────────────────────────────────────

/// Immutable summarization input.
#[derive(Debug, Clone)]
pub struct Document {
    pub title: String,
    pub authors: Vec<String>,
    pub abstract_text: String,
    /// Extracted full text; `None` when upstream extraction failed.
    pub full_text: Option<String>,
}

/// Which code path produced a summary. Recorded with every stored summary
/// so downstream consumers can judge its fidelity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SummaryMethod {
    AbstractOnly,
    FullTextSinglePass,
    Hierarchical { chunks: usize },
}

impl SummaryMethod {
    pub fn tag(&self) -> String {
        match self {
            SummaryMethod::AbstractOnly => "abstract_only".to_string(),
            SummaryMethod::FullTextSinglePass => "full_text_single_pass".to_string(),
            SummaryMethod::Hierarchical { chunks } => format!("hierarchical_{chunks}_chunks"),
        }
    }
}

impl std::fmt::Display for SummaryMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.tag())
    }
}

#[derive(Debug, Clone)]
pub struct SummaryResult {
    pub summary: String,
    pub method: SummaryMethod,
    /// Sections detected in the source text; empty on the abstract path.
    pub sections: SectionMap,
}

#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("tokenizer initialization failed: {0}")]
    Tokenizer(String),
    #[error("single-pass generation failed: {0}")]
    SinglePass(#[source] LlmError),
}

// ── Configuration ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SummarizerConfig {
    pub single_pass_threshold: usize,
    pub chunk_max_tokens: usize,
    /// Output-token bound for per-chunk generation calls.
    pub chunk_summary_max_tokens: u32,
    /// Output-token bound for the merge and single-pass calls.
    pub final_summary_max_tokens: u32,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            single_pass_threshold: SINGLE_PASS_THRESHOLD,
            chunk_max_tokens: CHUNK_MAX_TOKENS,
            chunk_summary_max_tokens: 2_000,
            final_summary_max_tokens: 3_000,
        }
    }
}

// ── Orchestrator ──────────────────────────────────────────────────────────────

pub struct Summarizer {
    backend: Arc<dyn LlmBackend>,
    counter: TokenCounter,
    config: SummarizerConfig,
}

impl Summarizer {
    pub fn new(backend: Arc<dyn LlmBackend>, config: SummarizerConfig) -> Result<Self, SummarizeError> {
        let counter = TokenCounter::new().map_err(|e| SummarizeError::Tokenizer(e.to_string()))?;
        Ok(Self { backend, counter, config })
    }

    pub fn counter(&self) -> &TokenCounter {
        &self.counter
    }

    #[instrument(skip(self, doc), fields(title = %doc.title))]
    pub async fn summarize(&self, doc: &Document) -> Result<SummaryResult, SummarizeError> {
        let Some(full_text) = doc.full_text.as_deref().filter(|t| !t.trim().is_empty()) else {
            warn!("no extracted text available, falling back to abstract-only summary");
            return Ok(SummaryResult {
                summary: doc.abstract_text.clone(),
                method: SummaryMethod::AbstractOnly,
                sections: SectionMap::default(),
            });
        };

        let sections = SectionMap::detect(full_text);
        debug!(sections = ?sections.names(), "detected sections");

        let body = strip_references(full_text);
        let token_count = self.counter.count(body);
        info!(token_count, "counted document tokens");

        if token_count < self.config.single_pass_threshold {
            let summary = self.single_pass(doc, body).await?;
            return Ok(SummaryResult {
                summary,
                method: SummaryMethod::FullTextSinglePass,
                sections,
            });
        }

        let chunks = chunk_text(&self.counter, body, self.config.chunk_max_tokens);
        let total = chunks.len();
        info!(n_chunks = total, "document over threshold, summarizing hierarchically");

        let mut chunk_summaries = Vec::with_capacity(total);
        for (i, chunk) in chunks.iter().enumerate() {
            let summary = self.summarize_chunk(chunk, i + 1, total, &doc.title).await;
            chunk_summaries.push(summary);
        }

        let summary = self.merge_summaries(doc, &chunk_summaries).await;
        Ok(SummaryResult {
            summary,
            method: SummaryMethod::Hierarchical { chunks: total },
            sections,
        })
    }

    /// One generation call over the whole reference-stripped text. Errors
    /// propagate: there is no partial result to fall back on here.
    async fn single_pass(&self, doc: &Document, body: &str) -> Result<String, SummarizeError> {
        let prompt = format!(
            "Analyze and summarize this research paper comprehensively.\n\n\
             Title: {}\n\
             Authors: {}\n\n\
             Full Paper Text:\n{}\n\n\
             Provide a comprehensive summary (3-5 paragraphs) covering:\n\
             1. Research problem and motivation\n\
             2. Methodology and approach\n\
             3. Key findings and results\n\
             4. Significance and contributions\n\
             5. Limitations or future work\n\n\
             Focus on the actual content and findings, not just the abstract.",
            doc.title,
            doc.authors.join(", "),
            body,
        );

        let req = LlmRequest::prompt(prompt, self.config.final_summary_max_tokens);
        let resp = self.backend.complete(req).await.map_err(SummarizeError::SinglePass)?;
        Ok(resp.content)
    }

    /// Summarize one chunk; on generation failure return a truncated raw
    /// excerpt instead so the document still completes.
    async fn summarize_chunk(
        &self,
        chunk: &str,
        position: usize,
        total: usize,
        title: &str,
    ) -> String {
        let prompt = format!(
            "You are summarizing part {position} of {total} from the paper: \"{title}\"\n\n\
             Extract and summarize the key information from this section:\n\n\
             {chunk}\n\n\
             Focus on:\n\
             - Main findings and claims\n\
             - Methodology details\n\
             - Results and evidence\n\
             - Important context\n\n\
             Be concise but comprehensive. If this section contains references \
             or acknowledgments, just note that briefly."
        );

        let req = LlmRequest::prompt(prompt, self.config.chunk_summary_max_tokens);
        match self.backend.complete(req).await {
            Ok(resp) => resp.content,
            Err(e) => {
                warn!(position, total, error = %e, "chunk generation failed, using raw excerpt");
                excerpt(chunk, EXCERPT_FALLBACK_CHARS).to_string()
            }
        }
    }

    /// Merge the ordered chunk summaries into one narrative; on generation
    /// failure fall back to concatenating them verbatim in order.
    async fn merge_summaries(&self, doc: &Document, chunk_summaries: &[String]) -> String {
        let combined = chunk_summaries
            .iter()
            .enumerate()
            .map(|(i, s)| format!("Section {}:\n{}", i + 1, s))
            .collect::<Vec<_>>()
            .join("\n\n---\n\n");

        let prompt = format!(
            "You are creating a final comprehensive summary for the paper: \"{}\"\n\
             By: {}\n\n\
             Here are summaries of different sections of the paper:\n\n\
             {}\n\n\
             Create a cohesive, comprehensive summary (3-5 paragraphs) that covers:\n\
             1. The research problem and motivation\n\
             2. The methodology and approach\n\
             3. Key findings and results\n\
             4. Significance and contributions\n\
             5. Limitations or future work (if mentioned)\n\n\
             Write as a unified narrative, not as separate sections.",
            doc.title,
            doc.authors.join(", "),
            combined,
        );

        let req = LlmRequest::prompt(prompt, self.config.final_summary_max_tokens);
        match self.backend.complete(req).await {
            Ok(resp) => resp.content,
            Err(e) => {
                warn!(error = %e, "merge generation failed, concatenating chunk summaries");
                chunk_summaries.join("\n\n")
            }
        }
    }
}

/// Char-boundary-safe prefix of `text`, at most `limit` bytes.
fn excerpt(text: &str, limit: usize) -> &str {
    if text.len() <= limit {
        return text;
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use papyra_llm::testing::{ScriptedBackend, ScriptedReply};

    fn doc(full_text: Option<&str>) -> Document {
        Document {
            title: "Scaling Laws for Paper Summaries".to_string(),
            authors: vec!["A. Author".to_string(), "B. Author".to_string()],
            abstract_text: "We study how summaries scale.".to_string(),
            full_text: full_text.map(String::from),
        }
    }

    fn small_config() -> SummarizerConfig {
        SummarizerConfig {
            single_pass_threshold: 100,
            chunk_max_tokens: 60,
            ..Default::default()
        }
    }

    /// Five paragraphs of ~40 common words each: every paragraph fits the
    /// 60-token chunk budget alone but no two fit together, so the chunker
    /// must produce exactly five chunks.
    fn five_paragraph_text() -> String {
        (0..5)
            .map(|_| "the cat sat on the mat and the dog ran in the park ".repeat(3))
            .map(|p| p.trim_end().to_string())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    #[tokio::test]
    async fn test_no_text_falls_back_to_abstract() {
        let backend = Arc::new(ScriptedBackend::new());
        let s = Summarizer::new(backend.clone(), SummarizerConfig::default()).unwrap();

        let result = s.summarize(&doc(None)).await.unwrap();
        assert_eq!(result.method, SummaryMethod::AbstractOnly);
        assert_eq!(result.summary, "We study how summaries scale.");
        assert!(result.sections.is_empty());
        assert_eq!(backend.call_count(), 0, "abstract fallback must not call the backend");
    }

    #[tokio::test]
    async fn test_blank_text_falls_back_to_abstract() {
        let backend = Arc::new(ScriptedBackend::new());
        let s = Summarizer::new(backend, SummarizerConfig::default()).unwrap();
        let result = s.summarize(&doc(Some("   \n\n  "))).await.unwrap();
        assert_eq!(result.method, SummaryMethod::AbstractOnly);
    }

    #[tokio::test]
    async fn test_short_document_uses_single_pass() {
        let backend = Arc::new(ScriptedBackend::with_script(vec![ScriptedReply::text(
            "single pass summary",
        )]));
        let s = Summarizer::new(backend.clone(), SummarizerConfig::default()).unwrap();

        let text = "A short paper about nothing much.\n\nIt has two paragraphs.";
        let result = s.summarize(&doc(Some(text))).await.unwrap();

        assert_eq!(result.method, SummaryMethod::FullTextSinglePass);
        assert_eq!(result.summary, "single pass summary");
        assert_eq!(backend.call_count(), 1, "single-pass path makes exactly one call");
    }

    #[tokio::test]
    async fn test_single_pass_failure_propagates() {
        let backend = Arc::new(ScriptedBackend::with_script(vec![ScriptedReply::fail(
            "provider down",
        )]));
        let s = Summarizer::new(backend, SummarizerConfig::default()).unwrap();

        let err = s.summarize(&doc(Some("Tiny text."))).await.unwrap_err();
        assert!(matches!(err, SummarizeError::SinglePass(_)));
    }

    #[tokio::test]
    async fn test_long_document_goes_hierarchical() {
        let text = five_paragraph_text();

        // Verify the fixture really chunks into five pieces with this budget
        let counter = TokenCounter::new().unwrap();
        let chunks = chunk_text(&counter, &text, small_config().chunk_max_tokens);
        assert_eq!(chunks.len(), 5, "fixture must produce exactly five chunks");

        let backend = Arc::new(ScriptedBackend::with_script(vec![
            ScriptedReply::text("s1"),
            ScriptedReply::text("s2"),
            ScriptedReply::text("s3"),
            ScriptedReply::text("s4"),
            ScriptedReply::text("s5"),
            ScriptedReply::text("merged narrative"),
        ]));
        let s = Summarizer::new(backend.clone(), small_config()).unwrap();

        let result = s.summarize(&doc(Some(&text))).await.unwrap();
        assert_eq!(result.method, SummaryMethod::Hierarchical { chunks: 5 });
        assert_eq!(result.method.tag(), "hierarchical_5_chunks");
        assert_eq!(result.summary, "merged narrative");
        // Five chunk calls plus one merge call
        assert_eq!(backend.call_count(), 6);

        // Chunk prompts are issued in document order
        let calls = backend.recorded_calls();
        for (i, call) in calls.iter().take(5).enumerate() {
            let prompt = &call.messages[0].content;
            assert!(
                prompt.contains(&format!("part {} of 5", i + 1)),
                "chunk prompt {} must carry its position",
                i + 1
            );
        }
        // Merge prompt sees the ordered chunk summaries
        let merge_prompt = &calls[5].messages[0].content;
        for tag in ["s1", "s2", "s3", "s4", "s5"] {
            assert!(merge_prompt.contains(tag));
        }
    }

    #[tokio::test]
    async fn test_failed_chunk_degrades_to_excerpt_without_aborting() {
        let text = five_paragraph_text();

        // Chunk 3 fails, merge also fails so the concatenation fallback
        // exposes exactly what each chunk contributed.
        let backend = Arc::new(ScriptedBackend::with_script(vec![
            ScriptedReply::text("s1"),
            ScriptedReply::text("s2"),
            ScriptedReply::fail("quota exceeded"),
            ScriptedReply::text("s4"),
            ScriptedReply::text("s5"),
            ScriptedReply::fail("quota exceeded"),
        ]));
        let s = Summarizer::new(backend.clone(), small_config()).unwrap();

        let result = s.summarize(&doc(Some(&text))).await.unwrap();
        assert_eq!(result.method, SummaryMethod::Hierarchical { chunks: 5 });

        for tag in ["s1", "s2", "s4", "s5"] {
            assert!(result.summary.contains(tag));
        }
        // Chunk 3's slot is a raw excerpt of its text, not a model summary
        assert!(result.summary.contains("the cat sat on the mat"));
        assert_eq!(backend.call_count(), 6, "failure must not stop later chunks");
    }

    #[tokio::test]
    async fn test_merge_failure_concatenates_in_order() {
        let text = five_paragraph_text();
        let backend = Arc::new(ScriptedBackend::with_script(vec![
            ScriptedReply::text("alpha"),
            ScriptedReply::text("beta"),
            ScriptedReply::text("gamma"),
            ScriptedReply::text("delta"),
            ScriptedReply::text("epsilon"),
            ScriptedReply::fail("timeout"),
        ]));
        let s = Summarizer::new(backend, small_config()).unwrap();

        let result = s.summarize(&doc(Some(&text))).await.unwrap();
        assert_eq!(result.summary, "alpha\n\nbeta\n\ngamma\n\ndelta\n\nepsilon");
    }

    #[tokio::test]
    async fn test_references_are_stripped_before_counting() {
        // Body below the threshold, references long enough to push it over:
        // the bibliography must not force the hierarchical path.
        let body = "A modest paper body.\n\nSecond paragraph.";
        let refs = "reference entry etc. ".repeat(200);
        let text = format!("{body}\n\nReferences\n{refs}");

        let backend = Arc::new(ScriptedBackend::with_script(vec![ScriptedReply::text("ok")]));
        let config = SummarizerConfig { single_pass_threshold: 100, ..Default::default() };
        let s = Summarizer::new(backend.clone(), config).unwrap();

        let result = s.summarize(&doc(Some(&text))).await.unwrap();
        assert_eq!(result.method, SummaryMethod::FullTextSinglePass);
        assert_eq!(backend.call_count(), 1);

        // The generation prompt must not include the bibliography
        let prompt = &backend.recorded_calls()[0].messages[0].content;
        assert!(!prompt.contains("reference entry"));
    }

    #[tokio::test]
    async fn test_sections_are_reported_with_result() {
        let text = "\nIntroduction\nwe introduce\n\nConclusion\nwe conclude\n";
        let backend = Arc::new(ScriptedBackend::new());
        let s = Summarizer::new(backend, SummarizerConfig::default()).unwrap();
        let result = s.summarize(&doc(Some(text))).await.unwrap();
        assert!(result.sections.contains(crate::sections::SectionName::Introduction));
        assert!(result.sections.contains(crate::sections::SectionName::Conclusion));
    }

    #[test]
    fn test_method_tags() {
        assert_eq!(SummaryMethod::AbstractOnly.tag(), "abstract_only");
        assert_eq!(SummaryMethod::FullTextSinglePass.tag(), "full_text_single_pass");
        assert_eq!(SummaryMethod::Hierarchical { chunks: 7 }.tag(), "hierarchical_7_chunks");
    }

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        let text = "héllo wörld ".repeat(100);
        let cut = excerpt(&text, 500);
        assert!(cut.len() <= 500);
        assert!(text.starts_with(cut));
    }
}
