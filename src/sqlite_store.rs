//! SQLite-backed [`KeyValueStore`] implementation.
//!
//! Every key lives in the single `kv` table created by
//! [`migrate`](crate::migrate). Values are opaque strings; the core decodes
//! them as video records.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::SqlitePool;

use caption_harness_core::store::KeyValueStore;

use crate::config::Config;
use crate::{db, migrate};

/// SQLite implementation of the [`KeyValueStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to the configured database, creating the schema if missing.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::apply(&pool).await?;
        Ok(Self::new(pool))
    }

    /// Open the configured database if it exists, without migrating it.
    pub async fn open_existing(config: &Config) -> Result<Option<Self>> {
        Ok(db::connect_existing(config).await?.map(Self::new))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to read {}", key))?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO kv (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(now)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to write {}", key))?;
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        // substr() rather than LIKE so `_` and `%` in the prefix match literally
        let keys: Vec<String> = sqlx::query_scalar(
            "SELECT key FROM kv WHERE substr(key, 1, ?) = ? ORDER BY key ASC",
        )
        .bind(prefix.chars().count() as i64)
        .bind(prefix)
        .fetch_all(&self.pool)
        .await?;
        Ok(keys)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM kv WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caption_harness_core::models::{VideoRecord, VideoStub};
    use caption_harness_core::store::{clear_store, get_video, list_video_ids, put_video};
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use std::str::FromStr;
    use tempfile::TempDir;

    async fn open(dir: &TempDir) -> SqliteStore {
        let path = dir.path().join("kv.sqlite");
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .unwrap()
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap();
        crate::migrate::apply(&pool).await.unwrap();
        SqliteStore::new(pool)
    }

    fn record(id: &str) -> VideoRecord {
        let stub = VideoStub {
            video_id: id.to_string(),
            title: format!("Title {}", id),
            published_at: "2024-01-01T00:00:00Z".to_string(),
        };
        VideoRecord::tombstone(&stub, chrono::Utc::now())
    }

    #[tokio::test]
    async fn set_overwrites_and_get_reads_back() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir).await;

        assert_eq!(store.get("video:a").await.unwrap(), None);
        store.set("video:a", "one").await.unwrap();
        store.set("video:a", "two").await.unwrap();
        assert_eq!(store.get("video:a").await.unwrap().as_deref(), Some("two"));

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM kv")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn list_keys_is_sorted_and_prefix_literal() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir).await;
        for key in ["video:b", "video:a", "meta:x", "video_c"] {
            store.set(key, "{}").await.unwrap();
        }

        assert_eq!(
            store.list_keys("video:").await.unwrap(),
            vec!["video:a", "video:b"]
        );
        assert_eq!(store.list_keys("").await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn video_helpers_and_clear() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir).await;
        put_video(&store, &record("x")).await.unwrap();
        put_video(&store, &record("y")).await.unwrap();

        assert_eq!(list_video_ids(&store).await.unwrap(), vec!["x", "y"]);
        let x = get_video(&store, "x").await.unwrap().unwrap();
        assert!(x.captions_disabled);

        assert_eq!(clear_store(&store).await.unwrap(), 2);
        assert!(list_video_ids(&store).await.unwrap().is_empty());
        assert!(!store.delete("video:x").await.unwrap());
    }

    fn config_at(dir: &TempDir) -> Config {
        let text = format!(
            "[channel]\nhandle = \"x\"\n[db]\npath = \"{}\"\n[archive]\ndir = \"{}\"\n",
            dir.path().join("db/kv.sqlite").display(),
            dir.path().join("archive").display(),
        );
        toml::from_str(&text).unwrap()
    }

    #[tokio::test]
    async fn open_existing_does_not_create_a_database() {
        let dir = TempDir::new().unwrap();
        let config = config_at(&dir);

        assert!(SqliteStore::open_existing(&config).await.unwrap().is_none());
        assert!(!config.db.path.exists());
        assert!(!dir.path().join("db").exists());

        let created = SqliteStore::open(&config).await.unwrap();
        put_video(&created, &record("z")).await.unwrap();
        created.close().await;

        let existing = SqliteStore::open_existing(&config).await.unwrap().unwrap();
        assert!(get_video(&existing, "z").await.unwrap().is_some());
        existing.close().await;
    }
}
