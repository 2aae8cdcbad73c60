//! Error types for the sync pipeline.
//!
//! Fatal setup failures are surfaced as [`SyncError`]; per-video caption
//! failures are classified by [`CaptionError`] so the engine can tell a
//! permanent "captions disabled" condition from a transient one.

use thiserror::Error;

/// Errors that abort a sync run.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("channel not found for handle: {0}")]
    ChannelNotFound(String),

    #[error("uploads playlist not found for channel: {0}")]
    UploadsPlaylistNotFound(String),

    #[error("platform request failed: {0:#}")]
    Platform(anyhow::Error),

    #[error("storage failed: {0:#}")]
    Storage(anyhow::Error),
}

/// Outcome of a failed caption fetch for one video.
#[derive(Error, Debug)]
pub enum CaptionError {
    /// Captions are disabled for this video. Permanent.
    #[error("captions are disabled for video {0}")]
    Disabled(String),

    /// Anything else (network, HTTP status, parse). Retried on the next run.
    #[error("caption fetch failed: {0:#}")]
    Other(#[from] anyhow::Error),
}
