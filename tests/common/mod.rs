//! Shared fixtures: a fake YouTube (Data API, watch page, timed text) on a
//! local port, plus config and archive helpers.

#![allow(dead_code)]

use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const HANDLE: &str = "NutritionDetective";
const PAGE_SIZE: usize = 2;

#[derive(Clone)]
pub struct FakeVideo {
    pub id: String,
    pub title: String,
    pub published_at: String,
    /// `None` means captions are disabled for this video.
    pub captions: Option<Vec<(f64, f64, String)>>,
}

impl FakeVideo {
    pub fn captioned(id: &str, title: &str, published_at: &str, lines: &[&str]) -> Self {
        let captions = lines
            .iter()
            .enumerate()
            .map(|(i, text)| (i as f64 * 5.0, 5.0, text.to_string()))
            .collect();
        Self {
            id: id.to_string(),
            title: title.to_string(),
            published_at: published_at.to_string(),
            captions: Some(captions),
        }
    }

    pub fn disabled(id: &str, title: &str, published_at: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            published_at: published_at.to_string(),
            captions: None,
        }
    }
}

/// The default channel: two 2024 videos (one with captions disabled) and
/// one from 2023.
pub fn default_videos() -> Vec<FakeVideo> {
    vec![
        FakeVideo::captioned(
            "vid2024a",
            "Vitamin C basics",
            "2024-02-01T10:00:00Z",
            &["welcome back", "today we talk about", "vitamin C and colds", "see you"],
        ),
        FakeVideo::disabled("vid2024b", "Members only", "2024-03-05T10:00:00Z"),
        FakeVideo::captioned(
            "vid2023a",
            "Fasting myths",
            "2023-06-10T10:00:00Z",
            &["skip breakfast?", "fasting & metabolism", "VITAMIN D too"],
        ),
    ]
}

struct FakeState {
    base_url: String,
    videos: Mutex<Vec<FakeVideo>>,
    timedtext_hits: AtomicUsize,
}

pub struct FakeYouTube {
    pub base_url: String,
    state: Arc<FakeState>,
}

impl FakeYouTube {
    pub fn start(videos: Vec<FakeVideo>) -> Self {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let state = Arc::new(FakeState {
            base_url: base_url.clone(),
            videos: Mutex::new(videos),
            timedtext_hits: AtomicUsize::new(0),
        });

        let app = Router::new()
            .route("/youtube/v3/search", get(search))
            .route("/youtube/v3/channels", get(channels))
            .route("/youtube/v3/playlistItems", get(playlist_items))
            .route("/watch", get(watch))
            .route("/api/timedtext", get(timedtext))
            .with_state(state.clone());

        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).unwrap();
                axum::serve(listener, app).await.unwrap();
            });
        });

        Self { base_url, state }
    }

    pub fn api_base_url(&self) -> String {
        format!("{}/youtube/v3", self.base_url)
    }

    /// Number of caption tracks downloaded so far.
    pub fn timedtext_hits(&self) -> usize {
        self.state.timedtext_hits.load(Ordering::SeqCst)
    }

    pub fn set_title(&self, id: &str, title: &str) {
        let mut videos = self.state.videos.lock().unwrap();
        if let Some(v) = videos.iter_mut().find(|v| v.id == id) {
            v.title = title.to_string();
        }
    }
}

type Params = Query<HashMap<String, String>>;

async fn search(Query(params): Params) -> Json<serde_json::Value> {
    let q = params.get("q").cloned().unwrap_or_default();
    if q.trim_start_matches('@') == HANDLE {
        Json(json!({"items": [{"id": {"kind": "youtube#channel", "channelId": "UCfake"}}]}))
    } else {
        Json(json!({"items": []}))
    }
}

async fn channels() -> Json<serde_json::Value> {
    Json(json!({"items": [{"contentDetails": {"relatedPlaylists": {"uploads": "UUfake"}}}]}))
}

async fn playlist_items(State(state): State<Arc<FakeState>>, Query(params): Params) -> Json<serde_json::Value> {
    let videos = state.videos.lock().unwrap().clone();
    let start: usize = params
        .get("pageToken")
        .and_then(|t| t.parse().ok())
        .unwrap_or(0);
    let end = (start + PAGE_SIZE).min(videos.len());

    let items: Vec<_> = videos[start..end]
        .iter()
        .map(|v| {
            json!({"snippet": {
                "title": v.title,
                "publishedAt": v.published_at,
                "resourceId": {"kind": "youtube#video", "videoId": v.id}
            }})
        })
        .collect();

    let mut body = json!({"items": items});
    if end < videos.len() {
        body["nextPageToken"] = json!(end.to_string());
    }
    Json(body)
}

async fn watch(State(state): State<Arc<FakeState>>, Query(params): Params) -> Response {
    let id = params.get("v").cloned().unwrap_or_default();
    let videos = state.videos.lock().unwrap().clone();
    let Some(video) = videos.iter().find(|v| v.id == id) else {
        return Html("<html><body>This video isn't available anymore</body></html>".to_string())
            .into_response();
    };

    let captions = if video.captions.is_some() {
        let track = json!([{
            "baseUrl": format!("{}/api/timedtext?v={}&lang=en", state.base_url, id),
            "languageCode": "en"
        }]);
        format!(
            r#","captions":{{"playerCaptionsTracklistRenderer":{{"captionTracks":{}}}}}"#,
            track
        )
    } else {
        String::new()
    };

    Html(format!(
        r#"<html><script>var ytInitialPlayerResponse = {{"playabilityStatus":{{"status":"OK"}}{}}};</script></html>"#,
        captions
    ))
    .into_response()
}

async fn timedtext(State(state): State<Arc<FakeState>>, Query(params): Params) -> String {
    state.timedtext_hits.fetch_add(1, Ordering::SeqCst);
    let id = params.get("v").cloned().unwrap_or_default();
    let videos = state.videos.lock().unwrap().clone();
    let lines = videos
        .iter()
        .find(|v| v.id == id)
        .and_then(|v| v.captions.clone())
        .unwrap_or_default();

    let mut xml = String::from(r#"<?xml version="1.0" encoding="utf-8" ?><transcript>"#);
    for (start, dur, text) in lines {
        let escaped = text
            .replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;");
        xml.push_str(&format!(
            r#"<text start="{}" dur="{}">{}</text>"#,
            start, dur, escaped
        ));
    }
    xml.push_str("</transcript>");
    xml
}

// ============ Config and archive helpers ============

/// Write a config under `root` pointing at `api_base`/`watch_base`.
pub fn write_config(root: &Path, api_base: &str, watch_base: &str, extra: &str) -> PathBuf {
    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let content = format!(
        r#"[channel]
handle = "{handle}"
{extra}

[db]
path = "{root}/data/captions.sqlite"

[archive]
dir = "{root}/data/transcripts"

[youtube]
api_key = "test-key"
api_base_url = "{api_base}"
watch_base_url = "{watch_base}"
timeout_secs = 5

[server]
bind = "127.0.0.1:0"
"#,
        handle = HANDLE,
        extra = extra,
        root = root.display(),
        api_base = api_base,
        watch_base = watch_base,
    );

    let path = config_dir.join("capt.toml");
    fs::write(&path, content).unwrap();
    path
}

pub fn archive_dir(root: &Path) -> PathBuf {
    root.join("data").join("transcripts")
}

/// Write `<archive>/<year>.json` with the given `videos` map.
pub fn write_partition(root: &Path, year: i32, videos: serde_json::Value) {
    let dir = archive_dir(root);
    fs::create_dir_all(&dir).unwrap();
    let body = json!({ "videos": videos });
    fs::write(
        dir.join(format!("{}.json", year)),
        serde_json::to_string_pretty(&body).unwrap(),
    )
    .unwrap();
}

/// A record in the persisted JSON shape.
pub fn record_json(id: &str, title: &str, published_at: &str, lines: &[&str]) -> serde_json::Value {
    let transcript: Vec<_> = lines
        .iter()
        .enumerate()
        .map(|(i, text)| json!({"text": text, "offset": i as f64 * 5.0, "duration": 5.0}))
        .collect();
    json!({
        "id": id,
        "title": title,
        "publishedAt": published_at,
        "transcript": transcript,
        "updatedAt": "2023-12-31T00:00:00.000Z"
    })
}
