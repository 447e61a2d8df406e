//! PDF download cache and text extraction.

use std::path::{Path, PathBuf};

use lopdf::Document as PdfDoc;
use tracing::{debug, instrument, warn};

use papyra_common::SandboxClient;

/// On-disk cache of downloaded PDFs, one file per paper. Old-style arXiv
/// ids contain a slash, so ids are sanitized before use as file names.
#[derive(Debug, Clone)]
pub struct PdfCache {
    dir: PathBuf,
}

impl PdfCache {
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn path_for(&self, arxiv_id: &str) -> PathBuf {
        let safe = arxiv_id.replace(['/', '\\'], "_");
        self.dir.join(format!("{safe}.pdf"))
    }

    pub fn contains(&self, arxiv_id: &str) -> bool {
        self.path_for(arxiv_id).exists()
    }

    pub fn store(&self, arxiv_id: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
        let path = self.path_for(arxiv_id);
        std::fs::write(&path, bytes)?;
        Ok(path)
    }
}

/// Download a paper's PDF into the cache, reusing a cached copy when
/// present. Returns the on-disk path.
#[instrument(skip(client, cache))]
pub async fn download_pdf(
    client: &SandboxClient,
    cache: &PdfCache,
    arxiv_id: &str,
    url: &str,
) -> anyhow::Result<PathBuf> {
    if cache.contains(arxiv_id) {
        debug!(arxiv_id, "PDF already cached");
        return Ok(cache.path_for(arxiv_id));
    }

    let bytes = client
        .get(url)?
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;

    let path = cache.store(arxiv_id, &bytes)?;
    debug!(arxiv_id, bytes = bytes.len(), "downloaded PDF");
    Ok(path)
}

/// Extract page text from a PDF, separated by page markers so downstream
/// consumers keep a coarse notion of position. Returns `None` when the
/// file yields no usable text (scanned or image-only PDFs).
pub fn extract_text(path: &Path) -> anyhow::Result<Option<String>> {
    let pdf = PdfDoc::load(path)?;

    let mut out = String::new();
    for (page_num, _) in pdf.get_pages() {
        match pdf.extract_text(&[page_num]) {
            Ok(text) if !text.trim().is_empty() => {
                out.push_str(&format!("\n--- Page {page_num} ---\n"));
                out.push_str(&text);
            }
            Ok(_) => {}
            Err(e) => {
                warn!(page = page_num, error = %e, "failed to extract page text");
            }
        }
    }

    if out.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(out))
}

/// [`extract_text`] on a blocking thread. lopdf parsing is CPU-bound, so a
/// large PDF must not stall the async executor.
pub async fn extract_text_off_thread(path: PathBuf) -> anyhow::Result<Option<String>> {
    tokio::task::spawn_blocking(move || extract_text(&path)).await?
}
