//! Transcript search over the configured store and archive.
//!
//! Thin wrapper around the core [`SearchAggregator`]. Search never fails and
//! never writes: an existing database is opened without migrations, and when
//! it is missing or cannot be opened the archive is searched on its own.

use anyhow::Result;
use tracing::{debug, warn};

use caption_harness_core::models::SearchResponse;
use caption_harness_core::search::SearchAggregator;
use caption_harness_core::store::memory::InMemoryStore;

use crate::archive_fs::JsonDirArchive;
use crate::config::Config;
use crate::sqlite_store::SqliteStore;

/// Core search function returning structured data (used by CLI and server).
pub async fn search_transcripts(config: &Config, query: &str) -> SearchResponse {
    if query.trim().is_empty() {
        return SearchResponse::default();
    }

    let archive = JsonDirArchive::new(&config.archive.dir);
    match SqliteStore::open_existing(config).await {
        Ok(Some(store)) => {
            let resp = SearchAggregator::new(&store)
                .with_archive(&archive)
                .search(query)
                .await;
            store.close().await;
            resp
        }
        Ok(None) => {
            debug!(db = %config.db.path.display(), "no database yet; searching archive only");
            archive_only(&archive, query).await
        }
        Err(e) => {
            warn!(error = %format!("{:#}", e), "live store unavailable; searching archive only");
            archive_only(&archive, query).await
        }
    }
}

async fn archive_only(archive: &JsonDirArchive, query: &str) -> SearchResponse {
    let empty = InMemoryStore::new();
    SearchAggregator::new(&empty)
        .with_archive(archive)
        .search(query)
        .await
}

/// CLI entry point: prints results to stdout, or the raw response as JSON.
pub async fn run_search(config: &Config, query: &str, json: bool) -> Result<()> {
    let resp = search_transcripts(config, query).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&resp)?);
        return Ok(());
    }

    if resp.results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, result) in resp.results.iter().enumerate() {
        let date = result.published_at.get(..10).unwrap_or(&result.published_at);
        println!(
            "{}. {} ({} matches)",
            i + 1,
            result.title,
            result.total_snippets
        );
        println!("    published: {}", date);
        println!("    id: {}", result.video_id);
        for snippet in &result.snippets {
            println!("    [{}] \"{}\"", snippet.timestamp, snippet.snippet.trim());
        }
        println!();
    }

    Ok(())
}
