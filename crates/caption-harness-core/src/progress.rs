//! Sync progress events.
//!
//! The engine emits a [`SyncProgressEvent`] when it starts listing a channel
//! and after each video it processes. Rendering (stderr, JSON lines) lives in
//! the application crate.

/// A single progress event for sync.
#[derive(Clone, Debug, PartialEq)]
pub enum SyncProgressEvent {
    /// Resolving the channel and paging through its uploads. Total unknown.
    Listing { target: String },
    /// `n` videos processed out of `total` listed.
    Processing { target: String, n: u64, total: u64 },
}

/// Receives progress events from a sync run.
pub trait SyncProgressReporter: Send + Sync {
    fn report(&self, event: SyncProgressEvent);
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl SyncProgressReporter for NoProgress {
    fn report(&self, _event: SyncProgressEvent) {}
}
