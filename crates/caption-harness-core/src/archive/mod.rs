//! Archival snapshot abstraction.
//!
//! An [`Archive`] holds one [`VideoCollection`] per calendar year of
//! publication. Partitions are read whole and written whole; a missing
//! partition reads as `None` rather than an error.

pub mod memory;

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::VideoCollection;

/// Year-partitioned archival storage.
#[async_trait]
pub trait Archive: Send + Sync {
    /// Read one year's partition; `None` when it does not exist.
    async fn read_partition(&self, year: i32) -> Result<Option<VideoCollection>>;

    /// Replace one year's partition.
    async fn write_partition(&self, year: i32, videos: &VideoCollection) -> Result<()>;

    /// Years with an existing partition, ascending.
    async fn list_partitions(&self) -> Result<Vec<i32>>;
}

/// Collect the identifiers of every archived video.
///
/// Used to seed the store sync with the set of videos it must not touch.
pub async fn archived_video_ids<A: Archive + ?Sized>(archive: &A) -> Result<HashSet<String>> {
    let mut ids = HashSet::new();
    for year in archive.list_partitions().await? {
        if let Some(partition) = archive.read_partition(year).await? {
            ids.extend(partition.videos.into_keys());
        }
    }
    Ok(ids)
}
