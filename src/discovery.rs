//! Recursive expansion of an input URL into the video URLs it contains.

use crate::rate_limit::RateLimiter;
use crate::source::{watch_url, UrlKind, VideoSource};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Expands videos, playlists and channels into a set of video URLs.
pub struct Discoverer {
    source: Arc<dyn VideoSource>,
    limiter: Arc<RateLimiter>,
    max_depth: u32,
}

impl Discoverer {
    pub fn new(source: Arc<dyn VideoSource>, limiter: Arc<RateLimiter>, max_depth: u32) -> Self {
        Self {
            source,
            limiter,
            max_depth,
        }
    }

    /// Discover every video reachable from `url` within the depth limit.
    ///
    /// Listing failures are logged and contribute nothing; discovery itself
    /// never fails. Once `cancel` fires no further listing is started and
    /// any running one is abandoned.
    #[instrument(skip(self, cancel))]
    pub async fn discover(&self, url: &str, cancel: &CancellationToken) -> BTreeSet<String> {
        let found = self.discover_at(url.trim().to_string(), 0, cancel).await;
        if cancel.is_cancelled() {
            info!("Discovery interrupted after {} videos", found.len());
        } else {
            info!("Discovered {} videos from {}", found.len(), url);
        }
        found
    }

    fn discover_at<'a>(
        &'a self,
        url: String,
        depth: u32,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, BTreeSet<String>> {
        async move {
            let mut discovered = BTreeSet::new();
            if depth > self.max_depth || cancel.is_cancelled() {
                return discovered;
            }

            match UrlKind::classify(&url) {
                UrlKind::Channel(_) | UrlKind::ChannelName(_) => {
                    discovered.extend(self.list(&url, "channel", cancel).await);
                    discovered.extend(self.channel_playlists(&url, depth, cancel).await);
                }
                UrlKind::Playlist(_) => {
                    discovered.extend(self.list(&url, "playlist", cancel).await);
                }
                UrlKind::Video(_) => {
                    discovered.insert(url);
                }
                UrlKind::Unknown => {
                    if url.contains("youtube.com/channel/")
                        || url.contains("youtube.com/c/")
                        || url.contains("youtube.com/@")
                    {
                        discovered.extend(self.list(&url, "channel", cancel).await);
                    } else if url.contains("playlist?list=") {
                        discovered.extend(self.list(&url, "playlist", cancel).await);
                    } else {
                        discovered.insert(url);
                    }
                }
            }

            discovered
        }
        .boxed()
    }

    /// List a playlist or channel as canonical watch URLs.
    async fn list(&self, url: &str, what: &str, cancel: &CancellationToken) -> Vec<String> {
        let listed = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            r = async {
                self.limiter.wait().await;
                self.source.list_videos(url).await
            } => Some(r),
        };

        match listed {
            None => {
                debug!("Skipped {} {} after interrupt", what, url);
                Vec::new()
            }
            Some(Ok(ids)) => {
                info!("Processing {}: {} ({} videos)", what, url, ids.len());
                ids.iter().map(|id| watch_url(id)).collect()
            }
            Some(Err(e)) => {
                warn!("Error processing {} {}: {}", what, url, e);
                Vec::new()
            }
        }
    }

    async fn channel_playlists(
        &self,
        channel_url: &str,
        depth: u32,
        cancel: &CancellationToken,
    ) -> BTreeSet<String> {
        let mut discovered = BTreeSet::new();
        if depth >= self.max_depth {
            return discovered;
        }

        let listed = tokio::select! {
            biased;
            _ = cancel.cancelled() => return discovered,
            r = async {
                self.limiter.wait().await;
                self.source.list_playlists(channel_url).await
            } => r,
        };
        let playlists = match listed {
            Ok(p) => p,
            Err(e) => {
                warn!("Error discovering channel playlists for {}: {}", channel_url, e);
                return discovered;
            }
        };

        for playlist in playlists {
            if cancel.is_cancelled() {
                break;
            }
            discovered.extend(self.discover_at(playlist, depth + 1, cancel).await);
        }
        discovered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::testing::ScriptedSource;
    use std::time::Duration;

    const CHANNEL: &str = "https://www.youtube.com/@reader";
    const PLAYLIST_A: &str = "https://www.youtube.com/playlist?list=PLa";
    const PLAYLIST_B: &str = "https://www.youtube.com/playlist?list=PLb";

    fn discoverer(source: ScriptedSource, depth: u32) -> (Discoverer, Arc<ScriptedSource>) {
        let source = Arc::new(source);
        let d = Discoverer::new(source.clone(), Arc::new(RateLimiter::disabled()), depth);
        (d, source)
    }

    fn ids(set: &BTreeSet<String>) -> Vec<String> {
        set.iter()
            .map(|u| u.trim_start_matches("https://www.youtube.com/watch?v=").to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_video_is_itself() {
        let (d, source) = discoverer(ScriptedSource::new(), 2);
        let found = d
            .discover("https://youtube.com/watch?v=ABC123", &CancellationToken::new())
            .await;

        assert_eq!(found.len(), 1);
        assert!(found.contains("https://youtube.com/watch?v=ABC123"));
        assert!(source.listed().is_empty());
    }

    #[tokio::test]
    async fn test_playlist_expands_to_watch_urls() {
        let source = ScriptedSource::new().with_listing(PLAYLIST_A, &["aaaaaaaaaaa", "bbbbbbbbbbb"]);
        let (d, _) = discoverer(source, 2);

        let found = d.discover(PLAYLIST_A, &CancellationToken::new()).await;
        assert_eq!(ids(&found), vec!["aaaaaaaaaaa", "bbbbbbbbbbb"]);
    }

    #[tokio::test]
    async fn test_channel_unions_playlists_and_dedups() {
        let source = ScriptedSource::new()
            .with_listing(CHANNEL, &["aaaaaaaaaaa", "bbbbbbbbbbb"])
            .with_playlists(CHANNEL, &[PLAYLIST_A, PLAYLIST_B])
            .with_listing(PLAYLIST_A, &["bbbbbbbbbbb", "ccccccccccc"])
            .with_listing(PLAYLIST_B, &["ddddddddddd"]);
        let (d, _) = discoverer(source, 2);

        let found = d.discover(CHANNEL, &CancellationToken::new()).await;
        assert_eq!(
            ids(&found),
            vec!["aaaaaaaaaaa", "bbbbbbbbbbb", "ccccccccccc", "ddddddddddd"]
        );
    }

    #[tokio::test]
    async fn test_depth_zero_skips_channel_playlists() {
        let source = ScriptedSource::new()
            .with_listing(CHANNEL, &["aaaaaaaaaaa"])
            .with_playlists(CHANNEL, &[PLAYLIST_A])
            .with_listing(PLAYLIST_A, &["ccccccccccc"]);
        let (d, source) = discoverer(source, 0);

        let found = d.discover(CHANNEL, &CancellationToken::new()).await;
        assert_eq!(ids(&found), vec!["aaaaaaaaaaa"]);
        assert_eq!(source.listed(), vec![CHANNEL.to_string()]);
    }

    #[tokio::test]
    async fn test_channel_playlist_cycle_terminates() {
        // A playlist URL that classifies as a channel listing again.
        let nested = "https://www.youtube.com/@reader/playlists";
        let source = ScriptedSource::new()
            .with_listing(CHANNEL, &["aaaaaaaaaaa"])
            .with_playlists(CHANNEL, &[nested])
            .with_listing(nested, &["bbbbbbbbbbb"])
            .with_playlists(nested, &[nested]);
        let (d, source) = discoverer(source, 2);

        let found = d.discover(CHANNEL, &CancellationToken::new()).await;
        assert_eq!(ids(&found), vec!["aaaaaaaaaaa", "bbbbbbbbbbb"]);
        // Root plus one listing per depth level 1 and 2.
        assert_eq!(source.listed().len(), 3);
    }

    #[tokio::test]
    async fn test_failed_branch_is_empty() {
        let source = ScriptedSource::new()
            .with_listing(CHANNEL, &["aaaaaaaaaaa"])
            .with_playlists(CHANNEL, &[PLAYLIST_A, PLAYLIST_B])
            .with_broken_listing(PLAYLIST_A)
            .with_listing(PLAYLIST_B, &["ddddddddddd"]);
        let (d, _) = discoverer(source, 2);

        let found = d.discover(CHANNEL, &CancellationToken::new()).await;
        assert_eq!(ids(&found), vec!["aaaaaaaaaaa", "ddddddddddd"]);
    }

    #[tokio::test]
    async fn test_unknown_falls_back_to_literal() {
        let (d, _) = discoverer(ScriptedSource::new(), 2);
        let found = d
            .discover("https://example.com/some/video", &CancellationToken::new())
            .await;
        assert!(found.contains("https://example.com/some/video"));
    }

    #[tokio::test]
    async fn test_cancel_stops_expansion() {
        let cancel = CancellationToken::new();
        let source = ScriptedSource::new()
            .with_listing(CHANNEL, &["aaaaaaaaaaa"])
            .with_playlists(CHANNEL, &[PLAYLIST_A, PLAYLIST_B])
            .with_listing(PLAYLIST_A, &["bbbbbbbbbbb"])
            .with_listing(PLAYLIST_B, &["ccccccccccc"])
            .cancelling_on_list(PLAYLIST_A, cancel.clone());
        let (d, source) = discoverer(source, 2);

        let found = d.discover(CHANNEL, &cancel).await;
        assert_eq!(ids(&found), vec!["aaaaaaaaaaa", "bbbbbbbbbbb"]);
        assert_eq!(
            source.listed(),
            vec![CHANNEL.to_string(), PLAYLIST_A.to_string()]
        );
    }

    #[tokio::test]
    async fn test_cancel_abandons_running_listing() {
        let source = ScriptedSource::new()
            .with_listing(PLAYLIST_A, &["aaaaaaaaaaa"])
            .with_list_delay(Duration::from_secs(60));
        let (d, _) = discoverer(source, 2);

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let found = tokio::time::timeout(Duration::from_secs(5), d.discover(PLAYLIST_A, &cancel))
            .await
            .unwrap();
        assert!(found.is_empty());
    }
}
