//! # Caption Harness CLI (`capt`)
//!
//! The `capt` binary is the primary interface for Caption Harness. It
//! provides commands for database initialization, caption sync, transcript
//! search, record retrieval, store maintenance, and starting the HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! capt --config ./config/capt.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `capt init` | Create the SQLite database and run schema migrations |
//! | `capt sync` | Incremental sync of the channel into the live store |
//! | `capt sync --snapshot` | Sync into per-year archive files instead |
//! | `capt search "<query>"` | Search transcripts in the store and archive |
//! | `capt get <video_id>` | Print one video's record and transcript |
//! | `capt stats` | Summarize the store and archive |
//! | `capt store clear --yes` | Delete every key in the live store |
//! | `capt serve` | Start the HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the database
//! capt init
//!
//! # Sync this year's uploads only, with JSON progress on stderr
//! capt sync --min-year 2024 --progress json
//!
//! # Freeze last year into the archive, then start the new year fresh
//! capt sync --snapshot --min-year 2023
//! capt store clear --yes
//!
//! # Search
//! capt search "vitamin c"
//! ```
//!
//! Logs go to stderr through `tracing`; set `RUST_LOG` to adjust
//! (default `info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::prelude::*;

use caption_harness::progress::ProgressMode;
use caption_harness::{config, get, ingest, migrate, search, server, stats};

/// Caption Harness CLI: incremental caption sync and transcript search for
/// a single YouTube channel.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/capt.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "capt",
    about = "Caption Harness: incremental YouTube caption sync and transcript search",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/capt.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the `kv` table. This command is
    /// idempotent; running it multiple times is safe.
    Init,

    /// Sync the configured channel's captions.
    ///
    /// Lists every upload, fetches captions for new, changed, or previously
    /// failed videos, and records videos with captions disabled so they are
    /// not retried.
    Sync {
        /// Write into per-year archive files instead of the live store.
        #[arg(long)]
        snapshot: bool,

        /// Skip videos published before this year (overrides `channel.min_year`).
        #[arg(long)]
        min_year: Option<i32>,

        /// Progress output on stderr. Defaults to `human` on a terminal, else `off`.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Search transcripts in the live store and archive.
    ///
    /// Case-insensitive substring match; each hit is shown with two
    /// segments of context on either side.
    Search {
        /// Text to search for.
        query: String,

        /// Print the raw JSON response.
        #[arg(long)]
        json: bool,
    },

    /// Print one video's record and transcript.
    Get {
        /// YouTube video id.
        video_id: String,

        /// Print the stored JSON record.
        #[arg(long)]
        json: bool,
    },

    /// Show store and archive statistics.
    Stats,

    /// Live store maintenance.
    Store {
        #[command(subcommand)]
        action: StoreAction,
    },

    /// Start the HTTP server.
    ///
    /// Binds to the address configured in `[server].bind`.
    Serve,
}

/// Store maintenance subcommands.
#[derive(Subcommand)]
enum StoreAction {
    /// Delete every key in the live store.
    ///
    /// Used when rolling a finished year over into the archive.
    Clear {
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(atty::is(atty::Stream::Stderr));

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer);

    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Sync {
            snapshot,
            min_year,
            progress,
        } => {
            let mode = progress.unwrap_or_else(ProgressMode::default_for_tty);
            ingest::run_sync(&cfg, snapshot, min_year, mode).await?;
        }
        Commands::Search { query, json } => {
            search::run_search(&cfg, &query, json).await?;
        }
        Commands::Get { video_id, json } => {
            get::run_get(&cfg, &video_id, json).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Store { action } => match action {
            StoreAction::Clear { yes } => {
                ingest::run_store_clear(&cfg, yes).await?;
            }
        },
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
