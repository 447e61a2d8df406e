//! Papyra command-line interface.
//!
//! Run with: cargo run -p papyra-cli -- ingest "large language models"

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "papyra", version, about = "Fetch, summarize, and listen to research papers")]
struct Cli {
    /// Path to papyra.toml (defaults to PAPYRA_CONFIG or ./papyra.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search arXiv and summarize matching papers into the knowledge base
    Ingest {
        /// arXiv search query
        query: String,
        /// Cap on papers fetched (defaults to the configured limit)
        #[arg(long)]
        max_results: Option<usize>,
        /// Re-process papers that were already summarized
        #[arg(long)]
        force: bool,
        /// Skip Zotero mirroring for this run
        #[arg(long)]
        no_zotero: bool,
    },
    /// Semantic search over stored summaries
    Search {
        query: String,
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// List stored papers
    List {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Render stored summaries into podcast episodes and rebuild the feed
    Podcast {
        /// How many of the most recent papers to render
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Serve the podcast feed and audio files
    Serve {
        /// Listen address, e.g. 127.0.0.1:8080
        #[arg(long)]
        addr: Option<SocketAddr>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("papyra=debug,info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Ingest {
            query,
            max_results,
            force,
            no_zotero,
        } => commands::ingest(&config, query, max_results, force, no_zotero).await,
        Command::Search { query, limit } => commands::search(&config, query, limit).await,
        Command::List { limit } => commands::list(&config, limit).await,
        Command::Podcast { limit } => commands::podcast(&config, limit).await,
        Command::Serve { addr } => commands::serve(&config, addr).await,
    }
}
