//! Scripted [`VideoSource`] for network-free tests.

use super::{VideoInfo, VideoSource};
use crate::error::{Result, ShelfError};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy)]
pub(crate) enum Failure {
    Transient,
    Permanent,
}

#[derive(Default)]
pub(crate) struct ScriptedSource {
    videos: HashMap<String, VideoInfo>,
    listings: HashMap<String, Vec<String>>,
    playlists: HashMap<String, Vec<String>>,
    broken_listings: HashSet<String>,
    failures: Mutex<HashMap<String, VecDeque<Failure>>>,
    fetch_delay: Duration,
    list_delay: Duration,
    cancel_on_list: Option<(String, CancellationToken)>,
    pub fetch_calls: AtomicUsize,
    pub list_calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_video(mut self, url: &str, id: &str, duration: f64) -> Self {
        self.videos.insert(
            url.to_string(),
            VideoInfo {
                id: Some(id.to_string()),
                title: Some(format!("Title {}", id)),
                channel: Some("Test Channel".to_string()),
                duration: Some(duration),
                description: Some("Chapter 1 00:00\nChapter 2 12:30\nthanks".to_string()),
                ..Default::default()
            },
        );
        self
    }

    pub fn with_info(mut self, url: &str, info: VideoInfo) -> Self {
        self.videos.insert(url.to_string(), info);
        self
    }

    pub fn with_listing(mut self, url: &str, ids: &[&str]) -> Self {
        self.listings
            .insert(url.to_string(), ids.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_playlists(mut self, channel_url: &str, urls: &[&str]) -> Self {
        self.playlists.insert(
            channel_url.to_string(),
            urls.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    pub fn with_broken_listing(mut self, url: &str) -> Self {
        self.broken_listings.insert(url.to_string());
        self
    }

    /// Fail the next `times` fetches of `url` before succeeding.
    pub fn failing(self, url: &str, times: usize, failure: Failure) -> Self {
        self.failures
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .extend(std::iter::repeat(failure).take(times));
        self
    }

    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    pub fn with_list_delay(mut self, delay: Duration) -> Self {
        self.list_delay = delay;
        self
    }

    /// Cancel `token` as soon as `url` is listed.
    pub fn cancelling_on_list(mut self, url: &str, token: CancellationToken) -> Self {
        self.cancel_on_list = Some((url.to_string(), token));
        self
    }

    pub fn fetches(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn listed(&self) -> Vec<String> {
        self.list_calls.lock().unwrap().clone()
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl VideoSource for ScriptedSource {
    async fn fetch_video(&self, url: &str) -> Result<VideoInfo> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        if !self.fetch_delay.is_zero() {
            tokio::time::sleep(self.fetch_delay).await;
        }

        let next_failure = self
            .failures
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(|q| q.pop_front());
        match next_failure {
            Some(Failure::Transient) => {
                return Err(ShelfError::Network(format!("Connection reset: {}", url)))
            }
            Some(Failure::Permanent) => {
                return Err(ShelfError::Extraction(format!("Private video: {}", url)))
            }
            None => {}
        }

        self.videos
            .get(url)
            .cloned()
            .ok_or_else(|| ShelfError::VideoNotFound(url.to_string()))
    }

    async fn list_videos(&self, url: &str) -> Result<Vec<String>> {
        self.list_calls.lock().unwrap().push(url.to_string());
        if let Some((target, token)) = &self.cancel_on_list {
            if target == url {
                token.cancel();
            }
        }
        if !self.list_delay.is_zero() {
            tokio::time::sleep(self.list_delay).await;
        }
        if self.broken_listings.contains(url) {
            return Err(ShelfError::Network(format!("HTTP Error 500 listing {}", url)));
        }
        Ok(self.listings.get(url).cloned().unwrap_or_default())
    }

    async fn list_playlists(&self, channel_url: &str) -> Result<Vec<String>> {
        if self.broken_listings.contains(channel_url) {
            return Err(ShelfError::Network(format!(
                "HTTP Error 500 listing playlists of {}",
                channel_url
            )));
        }
        Ok(self.playlists.get(channel_url).cloned().unwrap_or_default())
    }
}
