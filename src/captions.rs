//! Caption fetching from the public watch page.
//!
//! The watch page embeds the player response, whose `"captionTracks"`
//! array lists one timed-text URL per language. The fetcher picks the
//! configured language (falling back to the first track), downloads the
//! timed-text XML and turns each cue into a [`CaptionSegment`].
//!
//! Two timed-text layouts are understood:
//!
//! - `<text start="1.2" dur="3.4">…</text>`, times in seconds
//! - `<p t="1200" d="3400">…</p>` (format 3), times in milliseconds
//!
//! A page that is playable but lists no caption tracks means captions are
//! disabled, which is permanent ([`CaptionError::Disabled`]). Everything
//! else, including rate-limit interstitials, is transient.

use std::borrow::Cow;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use serde::Deserialize;
use tracing::debug;

use caption_harness_core::error::CaptionError;
use caption_harness_core::models::CaptionSegment;
use caption_harness_core::platform::CaptionFetcher;

use crate::config::YouTubeConfig;

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

pub struct WatchPageCaptionFetcher {
    http: reqwest::Client,
    watch_base_url: String,
    language: String,
}

impl WatchPageCaptionFetcher {
    pub fn new(config: &YouTubeConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            watch_base_url: config.watch_base_url.trim_end_matches('/').to_string(),
            language: config.caption_language.clone(),
        })
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        let resp = self
            .http
            .get(url)
            .header("Accept-Language", &self.language)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;
        if !resp.status().is_success() {
            bail!("GET {} returned HTTP {}", url, resp.status());
        }
        Ok(resp.text().await?)
    }
}

#[async_trait]
impl CaptionFetcher for WatchPageCaptionFetcher {
    async fn fetch_captions(&self, video_id: &str) -> Result<Vec<CaptionSegment>, CaptionError> {
        let watch_url = format!("{}/watch?v={}", self.watch_base_url, video_id);
        let page = self.get_text(&watch_url).await?;

        let tracks = match inspect_watch_page(&page)? {
            WatchPage::Tracks(tracks) => tracks,
            WatchPage::CaptionsDisabled => {
                return Err(CaptionError::Disabled(video_id.to_string()))
            }
        };

        let track = select_track(&tracks, &self.language)
            .ok_or_else(|| CaptionError::Disabled(video_id.to_string()))?;
        debug!(video_id, language = %track.language_code, "fetching caption track");

        let xml = self.get_text(&track.base_url).await?;
        Ok(parse_timed_text(&xml)?)
    }
}

/// One entry of the player response's `captionTracks` array.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    pub base_url: String,
    #[serde(default)]
    pub language_code: String,
    /// `"asr"` for auto-generated tracks.
    #[serde(default)]
    pub kind: Option<String>,
}

#[derive(Debug)]
pub enum WatchPage {
    Tracks(Vec<CaptionTrack>),
    CaptionsDisabled,
}

/// Classify a watch page: caption tracks, disabled, or an error.
pub fn inspect_watch_page(html: &str) -> Result<WatchPage> {
    const MARKER: &str = "\"captionTracks\":";

    let Some(pos) = html.find(MARKER) else {
        if html.contains("class=\"g-recaptcha\"") {
            bail!("rate limited by watch page (captcha)");
        }
        if !html.contains("\"playabilityStatus\":") {
            bail!("video unavailable");
        }
        return Ok(WatchPage::CaptionsDisabled);
    };

    // The array is followed by the rest of the player response; read one value.
    let rest = &html[pos + MARKER.len()..];
    let tracks: Vec<CaptionTrack> = serde_json::Deserializer::from_str(rest)
        .into_iter::<Vec<CaptionTrack>>()
        .next()
        .ok_or_else(|| anyhow!("captionTracks is empty"))?
        .context("Failed to parse captionTracks")?;

    if tracks.is_empty() {
        return Ok(WatchPage::CaptionsDisabled);
    }
    Ok(WatchPage::Tracks(tracks))
}

/// Pick a track: exact language, then regional variant (`en-GB`), then first.
pub fn select_track<'a>(tracks: &'a [CaptionTrack], language: &str) -> Option<&'a CaptionTrack> {
    let regional = format!("{}-", language);
    tracks
        .iter()
        .find(|t| t.language_code.eq_ignore_ascii_case(language))
        .or_else(|| tracks.iter().find(|t| t.language_code.starts_with(&regional)))
        .or_else(|| tracks.first())
}

/// Parse timed-text XML into ordered caption segments.
pub fn parse_timed_text(xml: &str) -> Result<Vec<CaptionSegment>> {
    let mut reader = quick_xml::Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut segments = Vec::new();
    // (offset, duration, text) of the cue being read
    let mut open: Option<(f64, f64, String)> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if let Some(timing) = cue_timing(&e)? {
                    open = Some((timing.0, timing.1, String::new()));
                }
            }
            Ok(Event::Text(te)) => {
                if let Some((_, _, text)) = open.as_mut() {
                    let piece = te.unescape().context("Bad entity in caption text")?;
                    if !text.is_empty() {
                        text.push(' ');
                    }
                    text.push_str(decode_html_entities(&piece).as_ref());
                }
            }
            Ok(Event::End(e)) => {
                let name = e.local_name();
                if name.as_ref() == b"text" || name.as_ref() == b"p" {
                    if let Some((offset, duration, text)) = open.take() {
                        segments.push(CaptionSegment {
                            text,
                            offset,
                            duration,
                        });
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => bail!("Malformed timed-text XML: {}", e),
            _ => {}
        }
        buf.clear();
    }

    Ok(segments)
}

/// Timing of a `<text>` (seconds) or `<p>` (milliseconds) cue, in seconds.
fn cue_timing(e: &BytesStart<'_>) -> Result<Option<(f64, f64)>> {
    let (start_key, dur_key, scale): (&[u8], &[u8], f64) = match e.local_name().as_ref() {
        b"text" => (b"start", b"dur", 1.0),
        b"p" => (b"t", b"d", 1000.0),
        _ => return Ok(None),
    };

    let mut start = 0.0;
    let mut dur = 0.0;
    for attr in e.attributes() {
        let attr = attr.context("Bad attribute in timed-text XML")?;
        let key = attr.key.as_ref();
        if key == start_key || key == dur_key {
            let raw = attr.unescape_value()?;
            let value: f64 = raw
                .trim()
                .parse()
                .with_context(|| format!("Bad cue time: {}", raw))?;
            if key == start_key {
                start = value / scale;
            } else {
                dur = value / scale;
            }
        }
    }
    Ok(Some((start, dur)))
}

/// Cue text is HTML-escaped before being XML-escaped (`&amp;#39;`), so a
/// second pass is needed after the XML reader has run.
fn decode_html_entities(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }
    match quick_xml::escape::unescape(text) {
        Ok(decoded) => Cow::Owned(decoded.into_owned()),
        Err(_) => Cow::Borrowed(text),
    }
}
