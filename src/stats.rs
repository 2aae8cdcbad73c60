//! Store and archive statistics.
//!
//! Provides a quick summary of what has been synced: record counts, how
//! many videos have captions disabled, how many are waiting for a retry,
//! and a per-year breakdown of the archive. Used by `capt stats` to give
//! confidence that syncs are working as expected.

use anyhow::Result;
use tracing::warn;

use caption_harness_core::archive::Archive;
use caption_harness_core::models::VideoRecord;
use caption_harness_core::store::{get_video, list_video_ids};

use crate::archive_fs::JsonDirArchive;
use crate::config::Config;
use crate::sqlite_store::SqliteStore;

/// Counts over a set of video records.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Tally {
    pub videos: u64,
    pub with_captions: u64,
    pub captions_disabled: u64,
    pub awaiting_retry: u64,
    pub segments: u64,
}

impl Tally {
    pub fn add(&mut self, record: &VideoRecord) {
        self.videos += 1;
        self.segments += record.transcript.len() as u64;
        if record.captions_disabled {
            self.captions_disabled += 1;
        } else if record.awaiting_retry() {
            self.awaiting_retry += 1;
        } else {
            self.with_captions += 1;
        }
    }
}

/// Run the stats command: read the store and archive and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let store = SqliteStore::open(config).await?;

    let mut live = Tally::default();
    let mut undecodable = 0u64;
    for id in list_video_ids(&store).await? {
        match get_video(&store, &id).await {
            Ok(Some(record)) => live.add(&record),
            Ok(None) => {}
            Err(e) => {
                warn!(video_id = %id, error = %format!("{:#}", e), "undecodable record");
                undecodable += 1;
            }
        }
    }

    let last_write: Option<i64> = sqlx::query_scalar("SELECT MAX(updated_at) FROM kv")
        .fetch_one(store.pool())
        .await?;
    store.close().await;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Caption Harness — Stats");
    println!("=======================");
    println!();
    println!("  Channel:     @{}", config.channel.handle.trim_start_matches('@'));
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!(
        "  Last write:  {}",
        last_write
            .map(format_ts_relative)
            .unwrap_or_else(|| "never".to_string())
    );
    println!();
    println!("  Live store:");
    print_tally(&live);
    if undecodable > 0 {
        println!("    undecodable:        {}", undecodable);
    }

    let archive = JsonDirArchive::new(&config.archive.dir);
    let mut rows: Vec<(i32, Tally)> = Vec::new();
    for year in archive.list_partitions().await? {
        let mut tally = Tally::default();
        if let Some(partition) = archive.read_partition(year).await? {
            for record in partition.videos.values() {
                tally.add(record);
            }
        }
        rows.push((year, tally));
    }

    println!();
    println!("  Archive:     {}", config.archive.dir.display());
    if rows.is_empty() {
        println!("    (no partitions)");
    } else {
        println!(
            "  {:<8} {:>8} {:>10} {:>10} {:>10}",
            "YEAR", "VIDEOS", "CAPTIONED", "DISABLED", "SEGMENTS"
        );
        println!("  {}", "-".repeat(50));
        for (year, t) in &rows {
            println!(
                "  {:<8} {:>8} {:>10} {:>10} {:>10}",
                year, t.videos, t.with_captions, t.captions_disabled, t.segments
            );
        }
    }

    println!();
    Ok(())
}

fn print_tally(t: &Tally) {
    println!("    videos:             {}", t.videos);
    println!("    with captions:      {}", t.with_captions);
    println!("    captions disabled:  {}", t.captions_disabled);
    println!("    awaiting retry:     {}", t.awaiting_retry);
    println!("    segments:           {}", t.segments);
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format a Unix timestamp as a relative time string (e.g. "3 hours ago").
fn format_ts_relative(ts: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let delta = now - ts;

    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}
