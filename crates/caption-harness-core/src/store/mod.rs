//! Storage abstraction for Caption Harness.
//!
//! The [`KeyValueStore`] trait is the live store: a flat string-keyed map
//! holding one serialized [`VideoRecord`] per `video:<id>` key. Backends are
//! pluggable (SQLite in the application crate, in-memory here).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::models::{video_key, VideoRecord, VIDEO_KEY_PREFIX};

/// Abstract keyed store.
///
/// All operations are async (via `async-trait`). In-memory implementations
/// return immediately-ready futures.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`get`](KeyValueStore::get) | Read a value, `None` when absent |
/// | [`set`](KeyValueStore::set) | Insert or overwrite a value |
/// | [`list_keys`](KeyValueStore::list_keys) | Keys starting with a prefix |
/// | [`delete`](KeyValueStore::delete) | Remove a key (store clearing only) |
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Keys beginning with `prefix`, in ascending key order.
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>>;

    /// Returns true if the key existed.
    async fn delete(&self, key: &str) -> Result<bool>;
}

/// Load and decode the record stored under `video:<video_id>`.
pub async fn get_video<S: KeyValueStore + ?Sized>(
    store: &S,
    video_id: &str,
) -> Result<Option<VideoRecord>> {
    let key = video_key(video_id);
    match store.get(&key).await? {
        Some(raw) => {
            let record = serde_json::from_str(&raw)
                .with_context(|| format!("Failed to decode record at {}", key))?;
            Ok(Some(record))
        }
        None => Ok(None),
    }
}

/// Encode and write a record under `video:<id>`.
pub async fn put_video<S: KeyValueStore + ?Sized>(store: &S, record: &VideoRecord) -> Result<()> {
    let raw = serde_json::to_string(record)?;
    store.set(&video_key(&record.id), &raw).await
}

/// All video identifiers present in the store, in key order.
pub async fn list_video_ids<S: KeyValueStore + ?Sized>(store: &S) -> Result<Vec<String>> {
    let keys = store.list_keys(VIDEO_KEY_PREFIX).await?;
    Ok(keys
        .into_iter()
        .filter_map(|k| k.strip_prefix(VIDEO_KEY_PREFIX).map(str::to_string))
        .collect())
}

/// Delete every key in the store. Destructive; used at archival rollover.
///
/// Returns the number of keys removed.
pub async fn clear_store<S: KeyValueStore + ?Sized>(store: &S) -> Result<usize> {
    let keys = store.list_keys("").await?;
    let mut removed = 0;
    for key in keys {
        if store.delete(&key).await? {
            removed += 1;
        }
    }
    Ok(removed)
}
