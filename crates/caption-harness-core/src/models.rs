//! Core data models used throughout Caption Harness.
//!
//! These types describe the captions and sync state of a single video, the
//! collections the sync engine produces, and the ephemeral search results the
//! aggregator computes. The JSON shapes (camelCase field names) match the
//! records persisted in the live store and in the archival year files.

use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key prefix for video records in the live store.
pub const VIDEO_KEY_PREFIX: &str = "video:";

/// Store key for a video record: `video:<videoId>`.
pub fn video_key(video_id: &str) -> String {
    format!("{}{}", VIDEO_KEY_PREFIX, video_id)
}

/// One timed unit of transcribed speech.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionSegment {
    pub text: String,
    /// Start position in seconds.
    pub offset: f64,
    /// Length in seconds.
    pub duration: f64,
}

/// Persisted captions and sync state for one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    pub id: String,
    pub title: String,
    /// Publication timestamp exactly as reported by the platform.
    pub published_at: String,
    #[serde(default)]
    pub transcript: Vec<CaptionSegment>,
    pub updated_at: String,
    /// Tombstone: the platform has captions disabled for this video.
    #[serde(
        default,
        alias = "transcriptDisabled",
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub captions_disabled: bool,
}

impl VideoRecord {
    /// Build a record for a successfully fetched transcript.
    pub fn fetched(stub: &VideoStub, transcript: Vec<CaptionSegment>, now: DateTime<Utc>) -> Self {
        Self {
            id: stub.video_id.clone(),
            title: stub.title.clone(),
            published_at: stub.published_at.clone(),
            transcript,
            updated_at: format_iso(now),
            captions_disabled: false,
        }
    }

    /// Build a tombstone. The transcript is always empty.
    pub fn tombstone(stub: &VideoStub, now: DateTime<Utc>) -> Self {
        Self {
            id: stub.video_id.clone(),
            title: stub.title.clone(),
            published_at: stub.published_at.clone(),
            transcript: Vec::new(),
            updated_at: format_iso(now),
            captions_disabled: true,
        }
    }

    /// True when the last fetch failed transiently: nothing stored, no tombstone.
    pub fn awaiting_retry(&self) -> bool {
        self.transcript.is_empty() && !self.captions_disabled
    }

    /// True when the listing metadata no longer matches this record.
    pub fn metadata_differs(&self, stub: &VideoStub) -> bool {
        self.title != stub.title || self.published_at != stub.published_at
    }
}

/// A video entry from the channel's upload list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStub {
    pub video_id: String,
    pub title: String,
    pub published_at: String,
}

impl VideoStub {
    /// Calendar year of publication, if the timestamp parses.
    pub fn published_year(&self) -> Option<i32> {
        published_year(&self.published_at)
    }
}

/// Parse the year out of an RFC 3339 publication timestamp.
pub fn published_year(published_at: &str) -> Option<i32> {
    DateTime::parse_from_rfc3339(published_at)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).year())
}

/// Mapping from video identifier to record.
///
/// Serializes as `{ "videos": { "<id>": { ... } } }`, which is also the
/// layout of one archival year file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoCollection {
    #[serde(default)]
    pub videos: BTreeMap<String, VideoRecord>,
}

impl VideoCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: VideoRecord) {
        self.videos.insert(record.id.clone(), record);
    }

    pub fn get(&self, video_id: &str) -> Option<&VideoRecord> {
        self.videos.get(video_id)
    }

    pub fn contains(&self, video_id: &str) -> bool {
        self.videos.contains_key(video_id)
    }

    pub fn len(&self) -> usize {
        self.videos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }

    pub fn extend(&mut self, other: VideoCollection) {
        self.videos.extend(other.videos);
    }
}

/// A single matched excerpt within a [`SearchResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSnippet {
    /// Offset of the matched segment as `m:ss`.
    pub timestamp: String,
    pub snippet: String,
}

/// All matches for one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub video_id: String,
    pub title: String,
    pub published_at: String,
    pub snippets: Vec<SearchSnippet>,
    pub total_snippets: usize,
}

/// Response shape for a search: the results plus the normalized query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub query: String,
}

/// Format a timestamp as ISO 8601 with millisecond precision.
pub fn format_iso(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}
