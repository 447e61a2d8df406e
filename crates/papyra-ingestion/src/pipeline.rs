//! End-to-end ingestion pipeline.
//!
//! Orchestrates the full flow for one ingest run:
//!   1. Search arXiv for matching papers
//!   2. Skip papers already in the knowledge base
//!   3. Download and extract PDF text (cached on disk)
//!   4. Summarize (single pass or hierarchical, chosen by size)
//!   5. Embed the summary for semantic search
//!   6. Upsert into the knowledge base
//!   7. Mirror into Zotero when configured
//!
//! Papers are processed one at a time. The pipeline is non-destructive: a
//! failure on one paper is recorded and the run continues with the next.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};

use papyra_common::SandboxClient;
use papyra_kb::{doc_id, sections_json, PaperRecord, PaperStore, EMBEDDING_DIM};
use papyra_llm::LlmBackend;
use papyra_summarize::{Document, Summarizer};
use papyra_zotero::ZoteroClient;

use crate::models::{PaperMetadata, PaperSource};
use crate::pdf::{download_pdf, extract_text_off_thread, PdfCache};

/// Parameters for a single ingest run.
#[derive(Debug, Clone)]
pub struct IngestJob {
    pub query: String,
    pub max_results: usize,
    /// Re-process papers that are already stored.
    pub force: bool,
}

/// Summary of one ingest run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestResult {
    pub papers_found: usize,
    pub papers_summarized: usize,
    pub papers_skipped: usize,
    pub zotero_synced: usize,
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

pub struct Pipeline {
    source: Arc<dyn PaperSource>,
    http: SandboxClient,
    cache: PdfCache,
    summarizer: Summarizer,
    embedder: Arc<dyn LlmBackend>,
    store: PaperStore,
    zotero: Option<ZoteroClient>,
}

impl Pipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: Arc<dyn PaperSource>,
        http: SandboxClient,
        cache: PdfCache,
        summarizer: Summarizer,
        embedder: Arc<dyn LlmBackend>,
        store: PaperStore,
        zotero: Option<ZoteroClient>,
    ) -> Self {
        Self {
            source,
            http,
            cache,
            summarizer,
            embedder,
            store,
            zotero,
        }
    }

    pub fn store(&self) -> &PaperStore {
        &self.store
    }

    /// Embed free text with the pipeline's embedding backend. Used for
    /// search queries so stored vectors and queries share one space.
    pub async fn embed_query(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let mut vectors = self.embedder.embed(vec![text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedding backend returned no vector"))
    }

    #[instrument(skip(self, job), fields(query = %job.query))]
    pub async fn run(&self, job: &IngestJob) -> IngestResult {
        let t0 = std::time::Instant::now();
        let mut result = IngestResult::default();

        info!(max_results = job.max_results, "starting ingest run");

        let papers = match self.source.search(&job.query, job.max_results).await {
            Ok(papers) => papers,
            Err(e) => {
                result.errors.push(format!("search failed: {e}"));
                result.duration_ms = t0.elapsed().as_millis() as u64;
                return result;
            }
        };
        result.papers_found = papers.len();

        for paper in &papers {
            match self.process_paper(paper, job.force).await {
                Ok(ProcessOutcome::Summarized { zotero_synced }) => {
                    result.papers_summarized += 1;
                    if zotero_synced {
                        result.zotero_synced += 1;
                    }
                }
                Ok(ProcessOutcome::Skipped) => result.papers_skipped += 1,
                Err(e) => {
                    let msg = format!("{}: {e}", paper.arxiv_id);
                    warn!("{}", &msg);
                    result.errors.push(msg);
                }
            }
        }

        result.duration_ms = t0.elapsed().as_millis() as u64;
        info!(
            found = result.papers_found,
            summarized = result.papers_summarized,
            skipped = result.papers_skipped,
            errors = result.errors.len(),
            "ingest run finished"
        );
        result
    }

    async fn process_paper(
        &self,
        paper: &PaperMetadata,
        force: bool,
    ) -> anyhow::Result<ProcessOutcome> {
        let id = doc_id(&paper.arxiv_id);

        if !force && self.store.is_processed(&id).await? {
            info!(arxiv_id = %paper.arxiv_id, "already processed, skipping");
            return Ok(ProcessOutcome::Skipped);
        }

        let full_text = self.fetch_text(paper).await;

        let document = Document {
            title: paper.title.clone(),
            authors: paper.authors.clone(),
            abstract_text: paper.abstract_text.clone(),
            full_text,
        };

        let summary = self.summarizer.summarize(&document).await?;
        info!(
            arxiv_id = %paper.arxiv_id,
            method = %summary.method,
            "summarized paper"
        );

        let embedding = self.embed_summary(&summary.summary).await;

        let record = PaperRecord {
            id,
            arxiv_id: paper.arxiv_id.clone(),
            title: paper.title.clone(),
            authors: paper.authors_joined(),
            abstract_text: paper.abstract_text.clone(),
            summary: summary.summary,
            summary_method: summary.method.tag(),
            sections: sections_json(&summary.sections)?,
            published_at: paper.published_at,
            pdf_url: paper.pdf_url.clone(),
            ingested_at: chrono::Utc::now(),
            embedding: Some(embedding),
        };

        self.store.upsert(&record).await?;

        // Mirroring is best-effort: a Zotero outage must not lose the summary
        let mut zotero_synced = false;
        if let Some(ref zotero) = self.zotero {
            match zotero.add_paper(&record).await {
                Ok(_) => zotero_synced = true,
                Err(e) => warn!(arxiv_id = %paper.arxiv_id, error = %e, "Zotero sync failed"),
            }
        }

        Ok(ProcessOutcome::Summarized { zotero_synced })
    }

    /// Download and extract the paper's text. Any failure here degrades to
    /// `None`, which routes the paper to the abstract-only summary path.
    async fn fetch_text(&self, paper: &PaperMetadata) -> Option<String> {
        let url = paper.pdf_url.as_deref()?;

        let path = match download_pdf(&self.http, &self.cache, &paper.arxiv_id, url).await {
            Ok(path) => path,
            Err(e) => {
                warn!(arxiv_id = %paper.arxiv_id, error = %e, "PDF download failed");
                return None;
            }
        };

        match extract_text_off_thread(path).await {
            Ok(Some(text)) => Some(text),
            Ok(None) => {
                warn!(arxiv_id = %paper.arxiv_id, "PDF contained no extractable text");
                None
            }
            Err(e) => {
                warn!(arxiv_id = %paper.arxiv_id, error = %e, "PDF extraction failed");
                None
            }
        }
    }

    /// Embed the summary; on failure store a zero vector so the row is
    /// still written and can be re-embedded later.
    async fn embed_summary(&self, summary: &str) -> Vec<f32> {
        match self.embedder.embed(vec![summary.to_string()]).await {
            Ok(mut vectors) if !vectors.is_empty() => {
                let v = vectors.swap_remove(0);
                if v.len() == EMBEDDING_DIM {
                    v
                } else {
                    warn!(
                        got = v.len(),
                        expected = EMBEDDING_DIM,
                        "embedding has wrong dimension, storing zero vector"
                    );
                    vec![0.0; EMBEDDING_DIM]
                }
            }
            Ok(_) => {
                warn!("embedding backend returned no vector, storing zero vector");
                vec![0.0; EMBEDDING_DIM]
            }
            Err(e) => {
                warn!(error = %e, "embedding failed, storing zero vector");
                vec![0.0; EMBEDDING_DIM]
            }
        }
    }
}

enum ProcessOutcome {
    Summarized { zotero_synced: bool },
    Skipped,
}
