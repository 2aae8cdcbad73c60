//! TOML configuration.
//!
//! Loaded once at startup from `--config` (default `./config/capt.toml`) and
//! passed by reference into every command. Only `[channel]`, `[db]` and
//! `[archive]` are required; `[youtube]` and `[server]` fall back to
//! defaults.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable consulted when `youtube.api_key` is not set.
pub const API_KEY_ENV: &str = "YOUTUBE_API_KEY";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub channel: ChannelConfig,
    pub db: DbConfig,
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub youtube: YouTubeConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChannelConfig {
    /// Channel handle, with or without the leading `@`.
    pub handle: String,
    /// Videos published before this year are skipped by the store sync.
    #[serde(default)]
    pub min_year: Option<i32>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ArchiveConfig {
    pub dir: PathBuf,
    #[serde(default = "default_true")]
    pub seed_from_archive: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct YouTubeConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_watch_base_url")]
    pub watch_base_url: String,
    #[serde(default = "default_caption_language")]
    pub caption_language: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base_url: default_api_base_url(),
            watch_base_url: default_watch_base_url(),
            caption_language: default_caption_language(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl YouTubeConfig {
    /// The configured key, or `YOUTUBE_API_KEY` from the environment.
    pub fn resolve_api_key(&self) -> Result<String> {
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            return Ok(key.to_string());
        }
        match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => bail!(
                "No YouTube API key: set youtube.api_key in the config or {}",
                API_KEY_ENV
            ),
        }
    }
}

fn default_api_base_url() -> String {
    "https://www.googleapis.com/youtube/v3".to_string()
}
fn default_watch_base_url() -> String {
    "https://www.youtube.com".to_string()
}
fn default_caption_language() -> String {
    "en".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7340".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.channel.handle.trim().trim_start_matches('@').is_empty() {
        bail!("channel.handle must not be empty");
    }

    if let Some(year) = config.channel.min_year {
        if !(1970..=9999).contains(&year) {
            bail!("channel.min_year must be between 1970 and 9999, got {}", year);
        }
    }

    if config.youtube.timeout_secs == 0 {
        bail!("youtube.timeout_secs must be > 0");
    }

    Ok(())
}
