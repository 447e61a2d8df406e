//! Configuration loading.
//!
//! Settings come from a `papyra.toml` file; every section and field has a
//! default, so an empty or missing file yields a working local setup. The
//! file location can be overridden with the `PAPYRA_CONFIG` environment
//! variable. API keys are never read from the file, only from the
//! environment (`PAPYRA_ANTHROPIC_API_KEY`, `PAPYRA_OPENAI_API_KEY`,
//! `PAPYRA_ZOTERO_API_KEY`).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

pub const CONFIG_ENV: &str = "PAPYRA_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "papyra.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub summarizer: SummarizerSettings,
    #[serde(default)]
    pub arxiv: ArxivConfig,
    #[serde(default)]
    pub zotero: ZoteroConfig,
    #[serde(default)]
    pub podcast: PodcastConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Root for the knowledge base, PDF cache, and podcast output.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl StorageConfig {
    pub fn kb_dir(&self) -> PathBuf {
        self.data_dir.join("kb")
    }

    pub fn pdf_dir(&self) -> PathBuf {
        self.data_dir.join("pdfs")
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.data_dir.join("audio")
    }

    pub fn feed_path(&self) -> PathBuf {
        self.data_dir.join("feed.xml")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LlmConfig {
    /// Generation model for the Anthropic backend.
    #[serde(default = "default_anthropic_model")]
    pub anthropic_model: String,
    /// Generation model for the OpenAI backend.
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    /// Embedding model (OpenAI embeddings API).
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    /// Ollama server for the local fallback backend.
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,
    #[serde(default = "default_ollama_model")]
    pub ollama_model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            anthropic_model: default_anthropic_model(),
            openai_model: default_openai_model(),
            embedding_model: default_embedding_model(),
            ollama_url: default_ollama_url(),
            ollama_model: default_ollama_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SummarizerSettings {
    #[serde(default = "default_single_pass_threshold")]
    pub single_pass_threshold: usize,
    #[serde(default = "default_chunk_max_tokens")]
    pub chunk_max_tokens: usize,
}

impl Default for SummarizerSettings {
    fn default() -> Self {
        Self {
            single_pass_threshold: default_single_pass_threshold(),
            chunk_max_tokens: default_chunk_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArxivConfig {
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for ArxivConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ZoteroConfig {
    /// Numeric Zotero user id. Mirroring is disabled when unset.
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PodcastConfig {
    #[serde(default = "default_podcast_title")]
    pub title: String,
    #[serde(default = "default_podcast_description")]
    pub description: String,
    #[serde(default = "default_podcast_author")]
    pub author: String,
    /// Public base URL of the feed server.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_voice")]
    pub voice: String,
    #[serde(default = "default_serve_addr")]
    pub serve_addr: String,
}

impl Default for PodcastConfig {
    fn default() -> Self {
        Self {
            title: default_podcast_title(),
            description: default_podcast_description(),
            author: default_podcast_author(),
            base_url: default_base_url(),
            voice: default_voice(),
            serve_addr: default_serve_addr(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_anthropic_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}
fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_ollama_model() -> String {
    "llama3.1".to_string()
}
fn default_single_pass_threshold() -> usize {
    papyra_summarize::summarizer::SINGLE_PASS_THRESHOLD
}
fn default_chunk_max_tokens() -> usize {
    papyra_summarize::summarizer::CHUNK_MAX_TOKENS
}
fn default_max_results() -> usize {
    10
}
fn default_podcast_title() -> String {
    "Papyra Paper Briefs".to_string()
}
fn default_podcast_description() -> String {
    "Automatically generated audio summaries of recent research papers".to_string()
}
fn default_podcast_author() -> String {
    "Papyra".to_string()
}
fn default_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}
fn default_voice() -> String {
    "alloy".to_string()
}
fn default_serve_addr() -> String {
    "127.0.0.1:8080".to_string()
}

impl Config {
    /// Load configuration with the usual precedence: explicit `--config`
    /// path, then `PAPYRA_CONFIG`, then `./papyra.toml`, then defaults.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let candidate = explicit
            .map(PathBuf::from)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        if candidate.exists() {
            debug!(path = %candidate.display(), "loading configuration file");
            Self::from_file(&candidate)
        } else if explicit.is_some() {
            anyhow::bail!("config file not found: {}", candidate.display());
        } else {
            debug!("no configuration file found, using defaults");
            Ok(Self::default())
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = toml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("invalid config {}: {e}", path.display()))?;
        Ok(config)
    }

    pub fn anthropic_api_key() -> Option<String> {
        non_empty_env("PAPYRA_ANTHROPIC_API_KEY")
    }

    pub fn openai_api_key() -> Option<String> {
        non_empty_env("PAPYRA_OPENAI_API_KEY")
    }

    pub fn zotero_api_key() -> Option<String> {
        non_empty_env("PAPYRA_ZOTERO_API_KEY")
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_yields_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.storage.data_dir, PathBuf::from("./data"));
        assert_eq!(config.arxiv.max_results, 10);
        assert_eq!(config.summarizer.single_pass_threshold, 50_000);
        assert_eq!(config.summarizer.chunk_max_tokens, 15_000);
        assert!(config.zotero.user_id.is_none());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config: Config = toml::from_str(
            r#"
            [arxiv]
            max_results = 50

            [zotero]
            user_id = "1234567"
            "#,
        )
        .unwrap();
        assert_eq!(config.arxiv.max_results, 50);
        assert_eq!(config.zotero.user_id.as_deref(), Some("1234567"));
        assert_eq!(config.llm.embedding_model, "text-embedding-3-small");
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let result: Result<Config, _> = toml::from_str("[arxiv]\nmax_result = 3\n");
        assert!(result.is_err(), "typos in config keys must not pass silently");
    }

    #[test]
    fn test_storage_paths_derive_from_data_dir() {
        let config: Config = toml::from_str("[storage]\ndata_dir = \"/tmp/papyra\"\n").unwrap();
        assert_eq!(config.storage.kb_dir(), PathBuf::from("/tmp/papyra/kb"));
        assert_eq!(config.storage.pdf_dir(), PathBuf::from("/tmp/papyra/pdfs"));
        assert_eq!(config.storage.feed_path(), PathBuf::from("/tmp/papyra/feed.xml"));
    }

    #[test]
    fn test_missing_explicit_file_errors() {
        let err = Config::load(Some(Path::new("/nonexistent/papyra.toml"))).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
