use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use super::{Decision, SyncTarget, WriteOutcome};
use crate::archive::Archive;
use crate::models::{VideoCollection, VideoRecord, VideoStub};

/// Sync target that routes videos into per-year archival partitions.
///
/// A partition is read from the archive the first time a video of that year
/// is seen (missing ⇒ empty), mutated in memory, and written back in
/// [`finish`](SyncTarget::finish). Nothing is persisted before then, so an
/// interrupted run loses its partition writes. Archived videos are treated as
/// immutable: a video already in its partition is never re-fetched.
pub struct YearPartitionTarget<'a> {
    archive: &'a dyn Archive,
    min_year: Option<i32>,
    partitions: BTreeMap<i32, VideoCollection>,
}

impl<'a> YearPartitionTarget<'a> {
    pub fn new(archive: &'a dyn Archive) -> Self {
        Self {
            archive,
            min_year: None,
            partitions: BTreeMap::new(),
        }
    }

    /// Skip videos published before `year`.
    pub fn with_min_year(mut self, year: Option<i32>) -> Self {
        self.min_year = year;
        self
    }

    /// Years loaded so far in this run.
    pub fn touched_years(&self) -> Vec<i32> {
        self.partitions.keys().copied().collect()
    }

    async fn partition(&mut self, year: i32) -> Result<&mut VideoCollection> {
        if !self.partitions.contains_key(&year) {
            let loaded = self.archive.read_partition(year).await?.unwrap_or_default();
            self.partitions.insert(year, loaded);
        }
        Ok(self.partitions.entry(year).or_default())
    }

    fn insert(&mut self, record: &VideoRecord) {
        if let Some(year) = crate::models::published_year(&record.published_at) {
            self.partitions
                .entry(year)
                .or_default()
                .insert(record.clone());
        }
    }
}

#[async_trait]
impl SyncTarget for YearPartitionTarget<'_> {
    fn label(&self) -> &str {
        "snapshot"
    }

    async fn decide(&mut self, stub: &VideoStub) -> Result<Decision> {
        let Some(year) = stub.published_year() else {
            return Ok(Decision::Skip("unparseable publication date"));
        };
        if self.min_year.is_some_and(|min| year < min) {
            return Ok(Decision::Skip("published before cutoff year"));
        }

        let partition = self.partition(year).await?;
        match partition.get(&stub.video_id) {
            Some(existing) => Ok(Decision::Reuse(existing.clone())),
            None => Ok(Decision::Fetch { existing: None }),
        }
    }

    async fn store_fetched(
        &mut self,
        record: &VideoRecord,
        _existing: Option<VideoRecord>,
    ) -> Result<WriteOutcome> {
        self.insert(record);
        Ok(WriteOutcome::Written)
    }

    async fn store_tombstone(&mut self, record: &VideoRecord) -> Result<()> {
        self.insert(record);
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        for (year, videos) in &self.partitions {
            self.archive.write_partition(*year, videos).await?;
            info!(year, videos = videos.len(), "wrote partition");
        }
        Ok(())
    }
}
