//! In-memory [`Archive`] implementation for tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use super::Archive;
use crate::models::VideoCollection;

/// Year partitions held in a `BTreeMap` so listing is ascending.
pub struct InMemoryArchive {
    partitions: RwLock<BTreeMap<i32, VideoCollection>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl InMemoryArchive {
    pub fn new() -> Self {
        Self {
            partitions: RwLock::new(BTreeMap::new()),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    /// Seed a partition without counting it as a write.
    pub fn with_partition(self, year: i32, videos: VideoCollection) -> Self {
        if let Ok(mut parts) = self.partitions.write() {
            parts.insert(year, videos);
        }
        self
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryArchive {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Archive for InMemoryArchive {
    async fn read_partition(&self, year: i32) -> Result<Option<VideoCollection>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let parts = self
            .partitions
            .read()
            .map_err(|_| anyhow!("in-memory archive lock poisoned"))?;
        Ok(parts.get(&year).cloned())
    }

    async fn write_partition(&self, year: i32, videos: &VideoCollection) -> Result<()> {
        let mut parts = self
            .partitions
            .write()
            .map_err(|_| anyhow!("in-memory archive lock poisoned"))?;
        parts.insert(year, videos.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list_partitions(&self) -> Result<Vec<i32>> {
        let parts = self
            .partitions
            .read()
            .map_err(|_| anyhow!("in-memory archive lock poisoned"))?;
        Ok(parts.keys().copied().collect())
    }
}
