//! Directory of per-year JSON files implementing [`Archive`].
//!
//! Layout: `<dir>/<year>.json`, each holding a pretty-printed
//! `{ "videos": { "<id>": { ... } } }`. Files whose stem is not a year are
//! ignored, so the directory can hold other data.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use caption_harness_core::archive::Archive;
use caption_harness_core::models::VideoCollection;

pub struct JsonDirArchive {
    dir: PathBuf,
}

impl JsonDirArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn partition_path(&self, year: i32) -> PathBuf {
        self.dir.join(format!("{}.json", year))
    }
}

fn year_from_path(path: &Path) -> Option<i32> {
    if path.extension().and_then(|e| e.to_str()) != Some("json") {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

#[async_trait]
impl Archive for JsonDirArchive {
    async fn read_partition(&self, year: i32) -> Result<Option<VideoCollection>> {
        let path = self.partition_path(year);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()))
            }
        };
        let videos = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Some(videos))
    }

    async fn write_partition(&self, year: i32, videos: &VideoCollection) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let path = self.partition_path(year);
        let body = serde_json::to_string_pretty(videos)?;

        // Write beside the target and rename so readers never see a partial file
        let tmp = self.dir.join(format!(".{}.json.tmp", year));
        tokio::fs::write(&tmp, body)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("Failed to replace {}", path.display()))?;

        debug!(path = %path.display(), videos = videos.len(), "partition written");
        Ok(())
    }

    async fn list_partitions(&self) -> Result<Vec<i32>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to list {}", self.dir.display()))
            }
        };

        let mut years = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(year) = year_from_path(&entry.path()) {
                years.push(year);
            }
        }
        years.sort_unstable();
        Ok(years)
    }
}
