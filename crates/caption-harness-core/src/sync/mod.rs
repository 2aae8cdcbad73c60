//! Incremental caption sync.
//!
//! A sync run resolves a channel handle to its uploads list, pages through
//! every upload, and for each video asks a [`SyncTarget`] whether captions
//! need to be (re)fetched. Fetched transcripts and "captions disabled"
//! tombstones are handed back to the target to persist.
//!
//! # Targets
//!
//! | Target | Storage | Re-fetch policy |
//! |--------|---------|-----------------|
//! | [`KeyedStoreTarget`] | live [`KeyValueStore`](crate::store::KeyValueStore) | missing, empty-and-not-tombstoned, or title/date changed |
//! | [`YearPartitionTarget`] | [`Archive`](crate::archive::Archive) year files | missing from its year's partition |
//!
//! # Failure semantics
//!
//! Channel and uploads-list resolution failures abort the run. A caption
//! failure affects only its own video: "disabled" is recorded once as a
//! tombstone, anything else is logged and the video is left out of the run's
//! collection so that the next run retries it. There is no retry limit;
//! a transiently failing video is retried once per sync invocation, forever.

mod keyed;
mod partition;

pub use keyed::KeyedStoreTarget;
pub use partition::YearPartitionTarget;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{CaptionError, SyncError};
use crate::models::{VideoCollection, VideoRecord, VideoStub};
use crate::platform::{list_all_videos, CaptionFetcher, VideoPlatform};
use crate::progress::{NoProgress, SyncProgressEvent, SyncProgressReporter};

/// What a target wants done with one listed video.
#[derive(Debug, Clone)]
pub enum Decision {
    /// Leave the video out of this run entirely.
    Skip(&'static str),
    /// Keep the existing record as-is; it goes into the result collection.
    Reuse(VideoRecord),
    /// Fetch captions. `existing` is handed back to [`SyncTarget::store_fetched`].
    Fetch { existing: Option<VideoRecord> },
}

/// Result of persisting a freshly fetched record.
#[derive(Debug, Clone)]
pub enum WriteOutcome {
    Written,
    /// Content matched what was stored; carries the record to report instead.
    Unchanged(VideoRecord),
}

/// Where a sync run reads existing state from and writes results to.
#[async_trait]
pub trait SyncTarget: Send {
    /// Short label for logs and progress output.
    fn label(&self) -> &str;

    /// Decide whether `stub` needs a caption fetch.
    async fn decide(&mut self, stub: &VideoStub) -> Result<Decision>;

    /// Persist a record built from a successful fetch.
    async fn store_fetched(
        &mut self,
        record: &VideoRecord,
        existing: Option<VideoRecord>,
    ) -> Result<WriteOutcome>;

    /// Persist a "captions disabled" tombstone. Always written.
    async fn store_tombstone(&mut self, record: &VideoRecord) -> Result<()>;

    /// Called once after the last video. Batch targets flush here.
    async fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Per-run counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Videos returned by the upload listing.
    pub listed: u64,
    /// Left out by the target (year cutoff, already archived).
    pub skipped: u64,
    /// Existing record kept without a fetch.
    pub reused: u64,
    /// Successful caption fetches.
    pub fetched: u64,
    /// Fetched records that were written.
    pub written: u64,
    /// Fetched records identical to what was stored, so not written.
    pub identical: u64,
    /// Tombstones written for videos with captions disabled.
    pub tombstoned: u64,
    /// Transient caption failures; retried next run.
    pub failed: u64,
}

/// The collection a run produced together with its counters.
#[derive(Debug, Clone, Default)]
pub struct SyncOutcome {
    pub videos: VideoCollection,
    pub report: SyncReport,
}

/// Drives a sync run against injected platform and caption clients.
pub struct SyncEngine<'a> {
    platform: &'a dyn VideoPlatform,
    captions: &'a dyn CaptionFetcher,
    progress: &'a dyn SyncProgressReporter,
}

impl<'a> SyncEngine<'a> {
    pub fn new(platform: &'a dyn VideoPlatform, captions: &'a dyn CaptionFetcher) -> Self {
        Self {
            platform,
            captions,
            progress: &NoProgress,
        }
    }

    pub fn with_progress(mut self, progress: &'a dyn SyncProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Resolve `handle` and list every upload, in platform order.
    pub async fn list_channel(&self, handle: &str) -> Result<Vec<VideoStub>, SyncError> {
        let channel_id = self
            .platform
            .resolve_channel_id(handle)
            .await
            .map_err(SyncError::Platform)?
            .ok_or_else(|| SyncError::ChannelNotFound(handle.to_string()))?;
        info!(handle, channel_id = %channel_id, "resolved channel");

        let list_id = self
            .platform
            .resolve_uploads_list_id(&channel_id)
            .await
            .map_err(SyncError::Platform)?
            .ok_or_else(|| SyncError::UploadsPlaylistNotFound(channel_id.clone()))?;

        let stubs = list_all_videos(self.platform, &list_id)
            .await
            .map_err(SyncError::Platform)?;
        info!(list_id = %list_id, videos = stubs.len(), "listed uploads");
        Ok(stubs)
    }

    /// Run a full sync of `handle` through `target`.
    pub async fn run(
        &self,
        handle: &str,
        target: &mut dyn SyncTarget,
    ) -> Result<SyncOutcome, SyncError> {
        self.progress.report(SyncProgressEvent::Listing {
            target: target.label().to_string(),
        });

        let stubs = self.list_channel(handle).await?;
        let total = stubs.len() as u64;
        let mut outcome = SyncOutcome::default();
        outcome.report.listed = total;

        for (i, stub) in stubs.iter().enumerate() {
            self.sync_one(stub, target, &mut outcome).await?;
            self.progress.report(SyncProgressEvent::Processing {
                target: target.label().to_string(),
                n: i as u64 + 1,
                total,
            });
        }

        target.finish().await.map_err(SyncError::Storage)?;

        let r = &outcome.report;
        info!(
            sync_target = target.label(),
            listed = r.listed,
            skipped = r.skipped,
            reused = r.reused,
            fetched = r.fetched,
            written = r.written,
            identical = r.identical,
            tombstoned = r.tombstoned,
            failed = r.failed,
            "sync complete"
        );
        Ok(outcome)
    }

    async fn sync_one(
        &self,
        stub: &VideoStub,
        target: &mut dyn SyncTarget,
        outcome: &mut SyncOutcome,
    ) -> Result<(), SyncError> {
        let existing = match target.decide(stub).await.map_err(SyncError::Storage)? {
            Decision::Skip(reason) => {
                debug!(video_id = %stub.video_id, reason, "skipping video");
                outcome.report.skipped += 1;
                return Ok(());
            }
            Decision::Reuse(record) => {
                debug!(video_id = %stub.video_id, "no changes detected");
                outcome.report.reused += 1;
                outcome.videos.insert(record);
                return Ok(());
            }
            Decision::Fetch { existing } => existing,
        };

        info!(video_id = %stub.video_id, title = %stub.title, "fetching captions");

        match self.captions.fetch_captions(&stub.video_id).await {
            Ok(transcript) => {
                outcome.report.fetched += 1;
                let record = VideoRecord::fetched(stub, transcript, Utc::now());
                match target
                    .store_fetched(&record, existing)
                    .await
                    .map_err(SyncError::Storage)?
                {
                    WriteOutcome::Written => {
                        info!(video_id = %stub.video_id, segments = record.transcript.len(), "stored captions");
                        outcome.report.written += 1;
                        outcome.videos.insert(record);
                    }
                    WriteOutcome::Unchanged(kept) => {
                        debug!(video_id = %stub.video_id, "transcript unchanged");
                        outcome.report.identical += 1;
                        outcome.videos.insert(kept);
                    }
                }
            }
            Err(CaptionError::Disabled(_)) => {
                info!(video_id = %stub.video_id, "captions disabled, recording tombstone");
                let record = VideoRecord::tombstone(stub, Utc::now());
                target
                    .store_tombstone(&record)
                    .await
                    .map_err(SyncError::Storage)?;
                outcome.report.tombstoned += 1;
                outcome.videos.insert(record);
            }
            Err(err) => {
                warn!(video_id = %stub.video_id, error = %err, "caption fetch failed, will retry next run");
                outcome.report.failed += 1;
            }
        }

        Ok(())
    }
}
