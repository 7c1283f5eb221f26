//! Video source abstraction.
//!
//! The hosting platform's listing and metadata API is consumed through the
//! [`VideoSource`] trait; [`YtDlpSource`] implements it on top of `yt-dlp`.

#[cfg(test)]
pub(crate) mod testing;
mod youtube;

pub use youtube::{channel_playlists_url, YtDlpSource};

use crate::error::Result;
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use url::Url;

static YOUTUBE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(https?://)?(www\.)?(youtube\.com|youtu\.?be)/.+$").expect("valid regex")
});

static VIDEO_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("valid regex"));

/// Structural kind of a YouTube URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlKind {
    Video(String),
    Playlist(String),
    Channel(String),
    ChannelName(String),
    Unknown,
}

impl UrlKind {
    /// Classify a URL by its host, path and query.
    pub fn classify(input: &str) -> Self {
        let Some(url) = parse_lenient(input) else {
            return UrlKind::Unknown;
        };
        let host = url.host_str().unwrap_or_default().to_lowercase();
        let path = url.path();

        if host.contains("youtu.be") {
            let id = path.trim_matches('/');
            return if id.is_empty() {
                UrlKind::Unknown
            } else {
                UrlKind::Video(id.to_string())
            };
        }

        if !host.contains("youtube.com") {
            return UrlKind::Unknown;
        }

        if let Some(rest) = path.split("/channel/").nth(1) {
            return UrlKind::Channel(first_segment(rest));
        }
        if let Some(rest) = path.split("/c/").nth(1) {
            return UrlKind::ChannelName(first_segment(rest));
        }
        if let Some(rest) = path.split("/@").nth(1) {
            return UrlKind::ChannelName(first_segment(rest));
        }
        if path.contains("/playlist") {
            if let Some(id) = query_param(&url, "list") {
                return UrlKind::Playlist(id);
            }
        }
        if path.contains("/watch") {
            if let Some(id) = query_param(&url, "v") {
                return UrlKind::Video(id);
            }
        }

        UrlKind::Unknown
    }

    pub fn is_channel(&self) -> bool {
        matches!(self, UrlKind::Channel(_) | UrlKind::ChannelName(_))
    }
}

fn parse_lenient(input: &str) -> Option<Url> {
    let input = input.trim();
    Url::parse(input)
        .ok()
        .filter(|u| u.has_host())
        .or_else(|| Url::parse(&format!("https://{}", input)).ok())
}

fn first_segment(rest: &str) -> String {
    rest.split('/').next().unwrap_or_default().to_string()
}

fn query_param(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, v)| k == key && !v.is_empty())
        .map(|(_, v)| v.into_owned())
}

/// Whether a string has the shape of a YouTube URL.
pub fn is_youtube_url(input: &str) -> bool {
    YOUTUBE_URL.is_match(input)
}

/// Whether a string is a bare 11-character video id.
pub fn is_video_id(input: &str) -> bool {
    VIDEO_ID.is_match(input)
}

/// The canonical `watch?v=` form of a video id.
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// Best-effort video id from a URL, used when metadata carries none.
pub fn video_id_from_url(url: &str) -> String {
    match UrlKind::classify(url) {
        UrlKind::Video(id) => id,
        _ => url
            .rsplit("v=")
            .next()
            .unwrap_or(url)
            .split('&')
            .next()
            .unwrap_or(url)
            .to_string(),
    }
}

/// Metadata for a single video, as reported by the source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoInfo {
    pub id: Option<String>,
    pub title: Option<String>,
    pub channel: Option<String>,
    pub channel_url: Option<String>,
    pub duration: Option<f64>,
    pub upload_date: Option<String>,
    pub description: Option<String>,
    pub view_count: Option<u64>,
    pub like_count: Option<u64>,
    pub thumbnail: Option<String>,
    pub tags: Vec<String>,
    pub categories: Vec<String>,
}

impl VideoInfo {
    /// Build from a yt-dlp style info dictionary.
    pub fn from_json(json: &Value) -> Self {
        let text = |key: &str| json[key].as_str().map(|s| s.to_string());
        let list = |key: &str| {
            json[key]
                .as_array()
                .map(|a| {
                    a.iter()
                        .filter_map(|v| v.as_str().map(|s| s.to_string()))
                        .collect()
                })
                .unwrap_or_default()
        };

        Self {
            id: text("id"),
            title: text("title"),
            channel: text("channel").or_else(|| text("uploader")),
            channel_url: text("channel_url").or_else(|| text("uploader_url")),
            duration: json["duration"].as_f64(),
            upload_date: text("upload_date"),
            description: text("description"),
            view_count: json["view_count"].as_u64(),
            like_count: json["like_count"].as_u64(),
            thumbnail: text("thumbnail"),
            tags: list("tags"),
            categories: list("categories"),
        }
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration.unwrap_or(0.0)
    }
}

/// External listing/metadata API for videos, playlists and channels.
#[async_trait]
pub trait VideoSource: Send + Sync {
    /// Fetch full metadata for one video.
    async fn fetch_video(&self, url: &str) -> Result<VideoInfo>;

    /// List the video ids contained in a playlist or channel.
    async fn list_videos(&self, url: &str) -> Result<Vec<String>>;

    /// List the playlist URLs published by a channel.
    async fn list_playlists(&self, channel_url: &str) -> Result<Vec<String>>;
}
