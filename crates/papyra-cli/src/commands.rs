//! Subcommand implementations.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};

use papyra_common::SandboxClient;
use papyra_ingestion::{ArxivClient, IngestJob, PdfCache, Pipeline};
use papyra_kb::{Database, PaperRecord, PaperStore};
use papyra_llm::{AnthropicBackend, LlmBackend, OllamaBackend, OpenAiBackend};
use papyra_podcast::{write_rss, Episode, FeedConfig, ScriptWriter, TtsClient};
use papyra_summarize::{Summarizer, SummarizerConfig};
use papyra_zotero::ZoteroClient;

use crate::config::Config;

/// Pick the generation backend from available credentials: Anthropic,
/// then OpenAI, then a local Ollama server.
pub fn generation_backend(config: &Config) -> anyhow::Result<Arc<dyn LlmBackend>> {
    if let Some(key) = Config::anthropic_api_key() {
        info!(model = %config.llm.anthropic_model, "using Anthropic backend");
        return Ok(Arc::new(AnthropicBackend::new(key, &config.llm.anthropic_model)?));
    }
    if let Some(key) = Config::openai_api_key() {
        info!(model = %config.llm.openai_model, "using OpenAI backend");
        return Ok(Arc::new(OpenAiBackend::new(key, &config.llm.openai_model)?));
    }
    info!(url = %config.llm.ollama_url, model = %config.llm.ollama_model, "using Ollama backend");
    Ok(Arc::new(OllamaBackend::new(
        &config.llm.ollama_url,
        &config.llm.ollama_model,
    )?))
}

/// Embeddings always prefer OpenAI so stored vectors stay in one space;
/// Ollama is the offline fallback.
pub fn embedding_backend(config: &Config) -> anyhow::Result<Arc<dyn LlmBackend>> {
    if let Some(key) = Config::openai_api_key() {
        let backend = OpenAiBackend::new(key, &config.llm.openai_model)?
            .with_embedding_model(&config.llm.embedding_model);
        return Ok(Arc::new(backend));
    }
    warn!("no OpenAI key set, embedding via Ollama; vectors may need re-embedding later");
    Ok(Arc::new(OllamaBackend::new(
        &config.llm.ollama_url,
        &config.llm.ollama_model,
    )?))
}

async fn open_store(config: &Config) -> anyhow::Result<PaperStore> {
    let db = Database::open(config.storage.kb_dir()).await?;
    db.initialize().await?;
    Ok(PaperStore::new(Arc::new(db)))
}

fn zotero_client(config: &Config) -> Option<ZoteroClient> {
    let user_id = config.zotero.user_id.as_ref()?;
    let api_key = match Config::zotero_api_key() {
        Some(key) => key,
        None => {
            warn!("zotero.user_id set but PAPYRA_ZOTERO_API_KEY missing, mirroring disabled");
            return None;
        }
    };
    match ZoteroClient::new(api_key, user_id) {
        Ok(client) => Some(client),
        Err(e) => {
            warn!(error = %e, "failed to build Zotero client, mirroring disabled");
            None
        }
    }
}

pub async fn ingest(
    config: &Config,
    query: String,
    max_results: Option<usize>,
    force: bool,
    no_zotero: bool,
) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let backend = generation_backend(config)?;
    let embedder = embedding_backend(config)?;

    let summarizer = Summarizer::new(
        backend,
        SummarizerConfig {
            single_pass_threshold: config.summarizer.single_pass_threshold,
            chunk_max_tokens: config.summarizer.chunk_max_tokens,
            ..Default::default()
        },
    )?;

    let zotero = if no_zotero { None } else { zotero_client(config) };

    let pipeline = Pipeline::new(
        Arc::new(ArxivClient::new()?),
        SandboxClient::new()?,
        PdfCache::new(config.storage.pdf_dir())?,
        summarizer,
        embedder,
        store,
        zotero,
    );

    let job = IngestJob {
        query,
        max_results: max_results.unwrap_or(config.arxiv.max_results),
        force,
    };

    let result = pipeline.run(&job).await;

    println!(
        "Found {}, summarized {}, skipped {}, Zotero synced {} ({} ms)",
        result.papers_found,
        result.papers_summarized,
        result.papers_skipped,
        result.zotero_synced,
        result.duration_ms,
    );
    for error in &result.errors {
        println!("  error: {error}");
    }

    Ok(())
}

pub async fn search(config: &Config, query: String, limit: usize) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let embedder = embedding_backend(config)?;

    let mut vectors = embedder.embed(vec![query.clone()]).await?;
    let vector = vectors
        .pop()
        .ok_or_else(|| anyhow::anyhow!("embedding backend returned no vector"))?;

    let results = store.search_similar(&vector, limit).await?;
    if results.is_empty() {
        println!("No matches for \"{query}\".");
        return Ok(());
    }

    for (i, paper) in results.iter().enumerate() {
        println!("{}. {} [{}]", i + 1, paper.title, paper.arxiv_id);
        println!("   {}", first_line(&paper.summary));
    }
    Ok(())
}

pub async fn list(config: &Config, limit: usize) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let papers = store.list(0, limit).await?;
    let total = store.count().await?;

    println!("{total} papers stored");
    for paper in &papers {
        println!(
            "  {}  {}  ({})",
            paper.arxiv_id, paper.title, paper.summary_method
        );
    }
    Ok(())
}

/// Render the most recent papers into podcast episodes and rebuild the
/// feed. Requires an OpenAI key for speech synthesis.
pub async fn podcast(config: &Config, limit: usize) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let backend = generation_backend(config)?;

    let api_key = Config::openai_api_key()
        .ok_or_else(|| anyhow::anyhow!("podcast rendering needs PAPYRA_OPENAI_API_KEY for TTS"))?;
    let tts = TtsClient::new(api_key)?.with_voice(&config.podcast.voice);
    let writer = ScriptWriter::new(backend);

    let audio_dir = config.storage.audio_dir();
    std::fs::create_dir_all(&audio_dir)?;

    let papers = store.list(0, limit).await?;
    if papers.is_empty() {
        println!("Nothing to render; ingest some papers first.");
        return Ok(());
    }

    let mut episodes = Vec::new();
    for paper in &papers {
        match render_episode(&writer, &tts, &audio_dir, paper).await {
            Ok(episode) => {
                println!("Rendered {}", episode.audio_file);
                episodes.push(episode);
            }
            Err(e) => warn!(arxiv_id = %paper.arxiv_id, error = %e, "episode rendering failed"),
        }
    }

    episodes.sort_by(|a, b| b.published_at.cmp(&a.published_at));

    let feed = FeedConfig {
        title: config.podcast.title.clone(),
        link: config.podcast.base_url.clone(),
        description: config.podcast.description.clone(),
        author: config.podcast.author.clone(),
        audio_base_url: format!("{}/audio", config.podcast.base_url.trim_end_matches('/')),
    };
    let xml = write_rss(&feed, &episodes)?;
    std::fs::write(config.storage.feed_path(), &xml)?;

    println!(
        "Wrote {} episodes to {}",
        episodes.len(),
        config.storage.feed_path().display()
    );
    Ok(())
}

async fn render_episode(
    writer: &ScriptWriter,
    tts: &TtsClient,
    audio_dir: &std::path::Path,
    paper: &PaperRecord,
) -> anyhow::Result<Episode> {
    let file_name = format!("{}.mp3", paper.arxiv_id.replace(['/', '\\'], "_"));
    let out_path = audio_dir.join(&file_name);

    // Cached audio is reused; scripts are cheap but synthesis is not
    if !out_path.exists() {
        let script = writer.episode_script(paper).await;
        tts.synthesize(&script, &out_path).await?;
    }

    let audio_bytes = std::fs::metadata(&out_path)?.len();

    Ok(Episode {
        title: paper.title.clone(),
        description: first_line(&paper.summary).to_string(),
        audio_file: file_name,
        audio_bytes,
        guid: format!("papyra-{}", paper.id),
        published_at: paper.published_at.unwrap_or(paper.ingested_at),
    })
}

pub async fn serve(config: &Config, addr: Option<SocketAddr>) -> anyhow::Result<()> {
    let addr = match addr {
        Some(addr) => addr,
        None => config.podcast.serve_addr.parse()?,
    };
    papyra_podcast::serve(addr, config.storage.feed_path(), config.storage.audio_dir()).await
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or(text)
}
