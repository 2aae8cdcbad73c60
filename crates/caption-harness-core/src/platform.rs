//! Video platform collaborator traits.
//!
//! The sync engine talks to the hosting platform only through these two
//! traits. The application crate provides the YouTube implementations; tests
//! provide scripted fakes.

use anyhow::Result;
use async_trait::async_trait;

use crate::error::CaptionError;
use crate::models::{CaptionSegment, VideoStub};

/// One page of the upload list.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub items: Vec<VideoStub>,
    /// Continuation token; `None` ends pagination.
    pub next_cursor: Option<String>,
}

/// Channel and upload-list access on the hosting platform.
#[async_trait]
pub trait VideoPlatform: Send + Sync {
    /// Resolve a channel handle to a channel identifier.
    async fn resolve_channel_id(&self, handle: &str) -> Result<Option<String>>;

    /// Resolve a channel's canonical uploads list.
    async fn resolve_uploads_list_id(&self, channel_id: &str) -> Result<Option<String>>;

    /// Fetch one page of the uploads list. `cursor` is `None` for the first page.
    async fn list_page(&self, list_id: &str, cursor: Option<&str>) -> Result<ListPage>;
}

/// Caption track access for a single video.
#[async_trait]
pub trait CaptionFetcher: Send + Sync {
    /// Fetch the ordered caption segments for `video_id`.
    async fn fetch_captions(&self, video_id: &str) -> Result<Vec<CaptionSegment>, CaptionError>;
}

/// Page through an upload list until the platform stops returning a cursor.
pub async fn list_all_videos<P: VideoPlatform + ?Sized>(
    platform: &P,
    list_id: &str,
) -> Result<Vec<VideoStub>> {
    let mut stubs = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = platform.list_page(list_id, cursor.as_deref()).await?;
        stubs.extend(page.items);

        match page.next_cursor {
            Some(next) if !next.is_empty() => cursor = Some(next),
            _ => break,
        }
    }

    Ok(stubs)
}
