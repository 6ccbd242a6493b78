//! # News Timeline CLI (`timeline`)
//!
//! The `timeline` binary drives the news pipeline: it initializes daily
//! partitions, runs ingest cycles over the configured sources, and reads
//! the stored timeline back.
//!
//! ## Usage
//!
//! ```bash
//! timeline --config ./config/timeline.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `timeline init` | Create or migrate a day's partition |
//! | `timeline sources` | List configured sources |
//! | `timeline sync <all\|id>...` | Fetch, classify and store articles |
//! | `timeline list` | List a day's articles, newest first |
//! | `timeline get <id>` | Print one article |
//! | `timeline keywords` | Show the keyword index |
//! | `timeline classify "<title>"` | Classify a single title |
//! | `timeline reset` | Delete a day's articles and content files |
//! | `timeline partitions` | List partitions with article counts |
//!
//! Logs go to stderr and are filtered with `RUST_LOG` (default `info`).

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use news_timeline::{admin, config, get, ingest, keywords_cmd, sources, stats, store::TimelineStore};

/// News Timeline: keyword-classified news stored in daily partitions.
#[derive(Parser)]
#[command(
    name = "timeline",
    about = "News Timeline: keyword-classified news stored in daily SQLite partitions",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/timeline.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a day's partition, or add missing columns to an existing one.
    ///
    /// Idempotent; existing rows are never touched.
    Init {
        /// Partition date (YYYY-MM-DD). Defaults to today (UTC).
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// List configured sources.
    Sources,

    /// Run one ingest cycle.
    Sync {
        /// Source ids, or `all`.
        #[arg(default_value = "all")]
        sources: Vec<String>,

        /// Maximum number of articles fetched per source. Overrides
        /// `crawler.news_batch_limit`.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// List a day's articles, newest first.
    List {
        /// Partition date (YYYY-MM-DD). Defaults to today (UTC).
        #[arg(long)]
        date: Option<NaiveDate>,

        #[arg(long, default_value = "50")]
        limit: u32,

        #[arg(long, default_value = "0")]
        offset: u32,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Print one article by id.
    Get {
        id: String,

        /// Only search this partition. Defaults to all, newest first.
        #[arg(long)]
        date: Option<NaiveDate>,

        #[arg(long)]
        json: bool,
    },

    /// Show keyword counts and the original keywords.
    Keywords {
        /// Fail when the keyword document is missing, malformed or empty.
        #[arg(long)]
        check: bool,
    },

    /// Classify a single title against the keyword index.
    Classify { title: String },

    /// Delete a day's content files and stored articles.
    Reset {
        /// Day to reset (YYYY-MM-DD). Defaults to today (UTC).
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// List partitions with their article counts.
    Partitions,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    let today = Utc::now().date_naive();

    match cli.command {
        Commands::Init { date } => {
            let store = TimelineStore::new(&cfg.store.dir, date.unwrap_or(today));
            store
                .init()
                .await
                .with_context(|| format!("Failed to initialize {}", store.path().display()))?;
            println!("Partition initialized: {}", store.path().display());
        }
        Commands::Sources => {
            sources::list_sources(&cfg)?;
        }
        Commands::Sync { sources, limit } => {
            ingest::run_sync(&cfg, &sources, limit).await?;
        }
        Commands::List {
            date,
            limit,
            offset,
            json,
        } => {
            get::run_list(&cfg, date, limit, offset, json).await?;
        }
        Commands::Get { id, date, json } => {
            get::run_get(&cfg, &id, date, json).await?;
        }
        Commands::Keywords { check } => {
            keywords_cmd::run_keywords(&cfg, check)?;
        }
        Commands::Classify { title } => {
            keywords_cmd::run_classify(&cfg, &title)?;
        }
        Commands::Reset { date } => {
            admin::run_reset(&cfg, date.unwrap_or(today)).await?;
        }
        Commands::Partitions => {
            stats::run_partitions(&cfg).await?;
        }
    }

    Ok(())
}
