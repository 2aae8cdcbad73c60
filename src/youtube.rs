//! YouTube Data API v3 client implementing [`VideoPlatform`].
//!
//! Three endpoints are used:
//!
//! | Call | Endpoint |
//! |------|----------|
//! | handle → channel id | `search?part=snippet&type=channel&q=<handle>` |
//! | channel → uploads list | `channels?part=contentDetails&id=<channel>` |
//! | list page | `playlistItems?part=snippet&maxResults=50&playlistId=..&pageToken=..` |
//!
//! Playlist items without a video id or publication timestamp are dropped
//! here, so the engine only ever sees complete stubs.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use caption_harness_core::models::VideoStub;
use caption_harness_core::platform::{ListPage, VideoPlatform};

use crate::config::YouTubeConfig;

/// Items requested per `playlistItems` page (the API maximum).
pub const PAGE_SIZE: u32 = 50;

pub struct YouTubeClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl YouTubeClient {
    pub fn new(config: &YouTubeConfig) -> Result<Self> {
        let api_key = config.resolve_api_key()?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let resp = self
            .http
            .get(&url)
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .with_context(|| format!("YouTube {} request failed", endpoint))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!(
                "YouTube {} failed (HTTP {}): {}",
                endpoint,
                status,
                body.chars().take(500).collect::<String>()
            );
        }

        resp.json::<T>()
            .await
            .with_context(|| format!("Failed to decode YouTube {} response", endpoint))
    }
}

#[async_trait]
impl VideoPlatform for YouTubeClient {
    async fn resolve_channel_id(&self, handle: &str) -> Result<Option<String>> {
        let resp: SearchListResponse = self
            .get_json(
                "search",
                &[
                    ("part", "snippet"),
                    ("type", "channel"),
                    ("maxResults", "1"),
                    ("q", handle),
                ],
            )
            .await?;
        Ok(resp.first_channel_id())
    }

    async fn resolve_uploads_list_id(&self, channel_id: &str) -> Result<Option<String>> {
        let resp: ChannelListResponse = self
            .get_json("channels", &[("part", "contentDetails"), ("id", channel_id)])
            .await?;
        Ok(resp.uploads_list_id())
    }

    async fn list_page(&self, list_id: &str, cursor: Option<&str>) -> Result<ListPage> {
        let page_size = PAGE_SIZE.to_string();
        let mut params = vec![
            ("part", "snippet"),
            ("playlistId", list_id),
            ("maxResults", page_size.as_str()),
        ];
        if let Some(token) = cursor {
            params.push(("pageToken", token));
        }

        let resp: PlaylistItemListResponse = self.get_json("playlistItems", &params).await?;
        let page = resp.into_page();
        debug!(
            list_id,
            items = page.items.len(),
            more = page.next_cursor.is_some(),
            "fetched playlist page"
        );
        Ok(page)
    }
}

// ============ Response types ============

#[derive(Debug, Deserialize)]
struct SearchListResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    id: Option<SearchItemId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    #[serde(default)]
    channel_id: Option<String>,
}

impl SearchListResponse {
    fn first_channel_id(self) -> Option<String> {
        self.items
            .into_iter()
            .next()
            .and_then(|item| item.id)
            .and_then(|id| id.channel_id)
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct ChannelListResponse {
    #[serde(default)]
    items: Vec<ChannelItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelItem {
    #[serde(default)]
    content_details: Option<ContentDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContentDetails {
    #[serde(default)]
    related_playlists: Option<RelatedPlaylists>,
}

#[derive(Debug, Deserialize)]
struct RelatedPlaylists {
    #[serde(default)]
    uploads: Option<String>,
}

impl ChannelListResponse {
    fn uploads_list_id(self) -> Option<String> {
        self.items
            .into_iter()
            .next()
            .and_then(|c| c.content_details)
            .and_then(|d| d.related_playlists)
            .and_then(|p| p.uploads)
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemListResponse {
    #[serde(default)]
    items: Vec<PlaylistItem>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    #[serde(default)]
    snippet: Option<PlaylistSnippet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistSnippet {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    published_at: Option<String>,
    #[serde(default)]
    resource_id: Option<ResourceId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceId {
    #[serde(default)]
    video_id: Option<String>,
}

impl PlaylistItemListResponse {
    fn into_page(self) -> ListPage {
        let items = self
            .items
            .into_iter()
            .filter_map(|item| {
                let snippet = item.snippet?;
                let video_id = snippet.resource_id?.video_id.filter(|id| !id.is_empty())?;
                let published_at = snippet.published_at.filter(|p| !p.is_empty())?;
                Some(VideoStub {
                    video_id,
                    title: snippet.title.unwrap_or_default(),
                    published_at,
                })
            })
            .collect();
        ListPage {
            items,
            next_cursor: self.next_page_token.filter(|t| !t.is_empty()),
        }
    }
}
