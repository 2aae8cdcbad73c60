//! Transcript search across the live store and archival snapshots.
//!
//! The aggregator is a case-insensitive substring scan over every caption
//! segment it can find. It never writes and never fails: read errors from
//! either source are logged and the source contributes fewer results.
//!
//! # Algorithm
//!
//! 1. Trim the query; an empty query returns no results without touching
//!    any source.
//! 2. Lower-case the query.
//! 3. Scan every `video:` record in the live store (tombstones skipped).
//! 4. Scan every archival partition, ascending by year, skipping any video
//!    with a live key (the live copy wins even when it does not match) and
//!    any video already seen in an earlier partition.
//! 5. Each matching segment becomes a snippet: the segment plus up to
//!    [`CONTEXT_SEGMENTS`] neighbours on each side, joined with spaces and
//!    stamped with the matched segment's offset as `m:ss`.
//!
//! Results come back in discovery order, one per video. Overlapping
//! windows from adjacent matches are not merged.

use std::collections::HashSet;

use tracing::warn;

use crate::archive::Archive;
use crate::models::{
    CaptionSegment, SearchResponse, SearchResult, SearchSnippet, VideoRecord,
};
use crate::store::{list_video_ids, KeyValueStore};

/// Segments included on each side of a match.
pub const CONTEXT_SEGMENTS: usize = 2;

/// Read-only search over a live store and an optional archive.
pub struct SearchAggregator<'a> {
    store: &'a dyn KeyValueStore,
    archive: Option<&'a dyn Archive>,
}

impl<'a> SearchAggregator<'a> {
    pub fn new(store: &'a dyn KeyValueStore) -> Self {
        Self {
            store,
            archive: None,
        }
    }

    pub fn with_archive(mut self, archive: &'a dyn Archive) -> Self {
        self.archive = Some(archive);
        self
    }

    /// Run a query. Always returns a response, possibly with no results.
    pub async fn search(&self, query: &str) -> SearchResponse {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return SearchResponse::default();
        }

        let mut results = Vec::new();
        let (live_ids, records) = self.store_records().await;

        for record in records {
            if let Some(result) = match_video(&record, &query) {
                results.push(result);
            }
        }

        if let Some(archive) = self.archive {
            let mut seen = live_ids;
            for record in archive_records(archive).await {
                if !seen.insert(record.id.clone()) {
                    continue;
                }
                if let Some(result) = match_video(&record, &query) {
                    results.push(result);
                }
            }
        }

        SearchResponse { results, query }
    }

    /// Every live video id, plus the records that decoded.
    ///
    /// The id set covers tombstones and unreadable records too: any id with
    /// a live key shadows its archived copies.
    async fn store_records(&self) -> (HashSet<String>, Vec<VideoRecord>) {
        let ids = match list_video_ids(self.store).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %format!("{:#}", e), "listing store keys failed; searching archive only");
                return (HashSet::new(), Vec::new());
            }
        };

        let mut records = Vec::with_capacity(ids.len());
        for id in &ids {
            match crate::store::get_video(self.store, id).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => warn!(video_id = %id, error = %format!("{:#}", e), "skipping unreadable record"),
            }
        }
        (ids.into_iter().collect(), records)
    }
}

async fn archive_records(archive: &dyn Archive) -> Vec<VideoRecord> {
    let years = match archive.list_partitions().await {
        Ok(years) => years,
        Err(e) => {
            warn!(error = %format!("{:#}", e), "listing archive partitions failed");
            return Vec::new();
        }
    };

    let mut records = Vec::new();
    for year in years {
        match archive.read_partition(year).await {
            Ok(Some(partition)) => records.extend(partition.videos.into_values()),
            Ok(None) => {}
            Err(e) => warn!(year, error = %format!("{:#}", e), "skipping unreadable partition"),
        }
    }
    records
}

/// Scan one video for `query` (already lower-cased).
///
/// Returns `None` for tombstones and for videos without a match.
pub fn match_video(video: &VideoRecord, query: &str) -> Option<SearchResult> {
    if video.captions_disabled {
        return None;
    }

    let mut result: Option<SearchResult> = None;
    for (index, segment) in video.transcript.iter().enumerate() {
        if !segment.text.to_lowercase().contains(query) {
            continue;
        }
        let entry = result.get_or_insert_with(|| SearchResult {
            video_id: video.id.clone(),
            title: video.title.clone(),
            published_at: video.published_at.clone(),
            snippets: Vec::new(),
            total_snippets: 0,
        });
        entry.snippets.push(SearchSnippet {
            timestamp: format_timestamp(segment.offset),
            snippet: context_snippet(&video.transcript, index),
        });
    }

    result.map(|mut r| {
        r.total_snippets = r.snippets.len();
        r
    })
}

/// Join the segment at `index` with up to [`CONTEXT_SEGMENTS`] neighbours
/// on each side, clamped to the transcript bounds.
pub fn context_snippet(transcript: &[CaptionSegment], index: usize) -> String {
    let start = index.saturating_sub(CONTEXT_SEGMENTS);
    let end = (index + CONTEXT_SEGMENTS + 1).min(transcript.len());
    transcript[start..end]
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Format an offset in seconds as `m:ss`. Fractional seconds are dropped.
pub fn format_timestamp(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}
