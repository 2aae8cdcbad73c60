//! Video record retrieval by id.
//!
//! Looks in the live store first, then in the archive partitions, newest
//! year first. Used by both the `capt get` CLI command and the
//! `GET /videos/{id}` HTTP endpoint.

use anyhow::{bail, Result};

use caption_harness_core::archive::Archive;
use caption_harness_core::models::VideoRecord;
use caption_harness_core::search::format_timestamp;
use caption_harness_core::store::get_video;

use crate::archive_fs::JsonDirArchive;
use crate::config::Config;
use crate::sqlite_store::SqliteStore;

/// Where a record was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordSource {
    Store,
    Archive,
}

impl RecordSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordSource::Store => "store",
            RecordSource::Archive => "archive",
        }
    }
}

/// Look a video up in the store, then the archive. `None` when absent.
pub async fn find_video(
    config: &Config,
    video_id: &str,
) -> Result<Option<(VideoRecord, RecordSource)>> {
    if let Some(store) = SqliteStore::open_existing(config).await? {
        let live = get_video(&store, video_id).await;
        store.close().await;
        if let Some(record) = live? {
            return Ok(Some((record, RecordSource::Store)));
        }
    }

    let archive = JsonDirArchive::new(&config.archive.dir);
    let mut years = archive.list_partitions().await?;
    years.reverse();
    for year in years {
        if let Some(partition) = archive.read_partition(year).await? {
            if let Some(record) = partition.videos.get(video_id) {
                return Ok(Some((record.clone(), RecordSource::Archive)));
            }
        }
    }

    Ok(None)
}

/// CLI entry point: prints the record to stdout.
pub async fn run_get(config: &Config, video_id: &str, json: bool) -> Result<()> {
    let Some((record, source)) = find_video(config, video_id).await? else {
        bail!("video not found: {}", video_id);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    println!("--- Video ---");
    println!("id:           {}", record.id);
    println!("title:        {}", record.title);
    println!("published_at: {}", record.published_at);
    println!("updated_at:   {}", record.updated_at);
    println!("source:       {}", source.as_str());
    if record.captions_disabled {
        println!("captions:     disabled");
        return Ok(());
    }
    println!();

    println!("--- Transcript ({} segments) ---", record.transcript.len());
    for segment in &record.transcript {
        println!("[{}] {}", format_timestamp(segment.offset), segment.text);
    }

    Ok(())
}
