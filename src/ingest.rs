//! Sync orchestration.
//!
//! Wires the configured YouTube clients, the SQLite store and the JSON
//! archive into the core [`SyncEngine`] and runs one of its two targets:
//!
//! - **store** (default): incremental sync into the live keyed store,
//!   skipping anything already archived when `archive.seed_from_archive`
//!   is on.
//! - **snapshot** (`--snapshot`): route every video into its year file in
//!   the archive directory.

use anyhow::{bail, Result};
use std::collections::HashSet;

use caption_harness_core::archive::archived_video_ids;
use caption_harness_core::store::clear_store;
use caption_harness_core::sync::{
    KeyedStoreTarget, SyncEngine, SyncOutcome, SyncReport, YearPartitionTarget,
};

use crate::archive_fs::JsonDirArchive;
use crate::captions::WatchPageCaptionFetcher;
use crate::config::Config;
use crate::progress::{ProgressMode, SyncProgressReporter};
use crate::sqlite_store::SqliteStore;
use crate::youtube::YouTubeClient;

/// Incremental sync into the live store.
///
/// `min_year` overrides `channel.min_year` when set.
pub async fn sync_store(
    config: &Config,
    min_year: Option<i32>,
    progress: &dyn SyncProgressReporter,
) -> Result<SyncOutcome> {
    let platform = YouTubeClient::new(&config.youtube)?;
    let captions = WatchPageCaptionFetcher::new(&config.youtube)?;
    let store = SqliteStore::open(config).await?;

    let archived = if config.archive.seed_from_archive {
        let archive = JsonDirArchive::new(&config.archive.dir);
        archived_video_ids(&archive).await?
    } else {
        HashSet::new()
    };

    let mut target = KeyedStoreTarget::new(&store)
        .with_min_year(min_year.or(config.channel.min_year))
        .with_archived(archived);

    let outcome = SyncEngine::new(&platform, &captions)
        .with_progress(progress)
        .run(&config.channel.handle, &mut target)
        .await?;

    store.close().await;
    Ok(outcome)
}

/// Snapshot the channel into per-year archive files.
///
/// Unlike the store sync, `channel.min_year` is not applied; only an
/// explicit `min_year` limits which years are touched.
pub async fn sync_snapshot(
    config: &Config,
    min_year: Option<i32>,
    progress: &dyn SyncProgressReporter,
) -> Result<SyncOutcome> {
    let platform = YouTubeClient::new(&config.youtube)?;
    let captions = WatchPageCaptionFetcher::new(&config.youtube)?;
    let archive = JsonDirArchive::new(&config.archive.dir);

    let mut target = YearPartitionTarget::new(&archive).with_min_year(min_year);
    let outcome = SyncEngine::new(&platform, &captions)
        .with_progress(progress)
        .run(&config.channel.handle, &mut target)
        .await?;

    Ok(outcome)
}

/// `capt sync`: run one sync and print its counters.
pub async fn run_sync(
    config: &Config,
    snapshot: bool,
    min_year: Option<i32>,
    progress: ProgressMode,
) -> Result<()> {
    let reporter = progress.reporter();
    let (label, outcome) = if snapshot {
        (
            "snapshot",
            sync_snapshot(config, min_year, reporter.as_ref()).await?,
        )
    } else {
        ("store", sync_store(config, min_year, reporter.as_ref()).await?)
    };

    print_report(label, &outcome);
    Ok(())
}

fn print_report(label: &str, outcome: &SyncOutcome) {
    let SyncReport {
        listed,
        skipped,
        reused,
        fetched,
        written,
        identical,
        tombstoned,
        failed,
    } = outcome.report;

    println!("sync {}", label);
    println!("  listed: {} videos", listed);
    println!("  skipped: {}", skipped);
    println!("  reused: {}", reused);
    println!("  fetched: {}", fetched);
    println!("  written: {}", written);
    println!("  identical: {}", identical);
    println!("  captions disabled: {}", tombstoned);
    println!("  failed: {}", failed);
    println!("  videos in result: {}", outcome.videos.len());
    println!("ok");
}

/// `capt store clear`: delete every key in the live store.
pub async fn run_store_clear(config: &Config, yes: bool) -> Result<()> {
    if !yes {
        bail!("Refusing to clear the store without --yes");
    }

    let store = SqliteStore::open(config).await?;
    let removed = clear_store(&store).await?;
    store.close().await;

    tracing::info!(removed, "cleared live store");
    println!("Removed {} keys.", removed);
    Ok(())
}
