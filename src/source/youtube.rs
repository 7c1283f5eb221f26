//! `yt-dlp` backed video source.

use super::{is_video_id, VideoInfo, VideoSource};
use crate::error::{Result, ShelfError};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

/// Channel tabs that may trail a channel URL.
const CHANNEL_TABS: &[&str] = &[
    "videos",
    "playlists",
    "featured",
    "streams",
    "shorts",
    "about",
    "community",
];

/// Video source that shells out to `yt-dlp`.
pub struct YtDlpSource {
    socket_timeout: Duration,
    user_agent: String,
}

impl YtDlpSource {
    pub fn new(socket_timeout: Duration, user_agent: impl Into<String>) -> Self {
        Self {
            socket_timeout,
            user_agent: user_agent.into(),
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new("yt-dlp");
        cmd.arg("--no-warnings")
            .arg("--socket-timeout")
            .arg(self.socket_timeout.as_secs().max(1).to_string())
            .arg("--user-agent")
            .arg(&self.user_agent)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn run(&self, mut cmd: Command, context: &str) -> Result<String> {
        let output = cmd.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ShelfError::ToolNotFound("yt-dlp".to_string())
            } else {
                ShelfError::ToolFailed(format!("Failed to run yt-dlp: {}", e))
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ShelfError::from_tool_output(context, &stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Run a flat listing and return one JSON object per entry.
    async fn flat_entries(&self, url: &str) -> Result<Vec<serde_json::Value>> {
        let mut cmd = self.command();
        cmd.args(["--flat-playlist", "--dump-json", "--ignore-errors", url]);

        let stdout = self.run(cmd, &format!("listing {}", url)).await?;
        Ok(parse_json_lines(&stdout))
    }
}

#[async_trait]
impl VideoSource for YtDlpSource {
    #[instrument(skip(self))]
    async fn fetch_video(&self, url: &str) -> Result<VideoInfo> {
        let mut cmd = self.command();
        cmd.args(["--dump-json", "--no-download", "--no-playlist", url]);

        let stdout = self.run(cmd, &format!("fetching {}", url)).await?;
        let json: serde_json::Value = serde_json::from_str(stdout.trim()).map_err(|e| {
            ShelfError::Extraction(format!("Failed to parse yt-dlp output: {}", e))
        })?;

        debug!("Fetched metadata for {}", url);
        Ok(VideoInfo::from_json(&json))
    }

    #[instrument(skip(self))]
    async fn list_videos(&self, url: &str) -> Result<Vec<String>> {
        let entries = self.flat_entries(url).await?;
        let ids = video_ids_from_entries(&entries);
        debug!("Listed {} videos from {}", ids.len(), url);
        Ok(ids)
    }

    #[instrument(skip(self))]
    async fn list_playlists(&self, channel_url: &str) -> Result<Vec<String>> {
        let tab = channel_playlists_url(channel_url);
        let entries = self.flat_entries(&tab).await?;
        let urls = playlist_urls_from_entries(&entries);
        debug!("Listed {} playlists from {}", urls.len(), tab);
        Ok(urls)
    }
}

/// The `/playlists` tab of a channel URL.
pub fn channel_playlists_url(channel_url: &str) -> String {
    let base = channel_url.split('?').next().unwrap_or(channel_url);

    let mut base = base.trim_end_matches('/');
    if let Some((head, last)) = base.rsplit_once('/') {
        if CHANNEL_TABS.contains(&last) {
            base = head;
        }
    }
    format!("{}/playlists", base)
}

fn parse_json_lines(stdout: &str) -> Vec<serde_json::Value> {
    stdout
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|line| match serde_json::from_str(line) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("Skipping unparsable listing line: {}", e);
                None
            }
        })
        .collect()
}

/// Video ids among flat listing entries. Tabs and nested playlists are skipped.
fn video_ids_from_entries(entries: &[serde_json::Value]) -> Vec<String> {
    entries
        .iter()
        .filter_map(|e| e["id"].as_str())
        .filter(|id| is_video_id(id))
        .map(|id| id.to_string())
        .collect()
}

fn playlist_urls_from_entries(entries: &[serde_json::Value]) -> Vec<String> {
    entries
        .iter()
        .filter_map(|e| {
            let url = e["url"].as_str().unwrap_or_default();
            if url.contains("list=") {
                return Some(url.to_string());
            }
            e["id"]
                .as_str()
                .filter(|id| !is_video_id(id))
                .map(|id| format!("https://www.youtube.com/playlist?list={}", id))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_playlists_url() {
        assert_eq!(
            channel_playlists_url("https://www.youtube.com/@LibriVox"),
            "https://www.youtube.com/@LibriVox/playlists"
        );
        assert_eq!(
            channel_playlists_url("https://www.youtube.com/channel/UCabc/videos/"),
            "https://www.youtube.com/channel/UCabc/playlists"
        );
        assert_eq!(
            channel_playlists_url("https://www.youtube.com/c/Readings?view=0"),
            "https://www.youtube.com/c/Readings/playlists"
        );
    }

    #[test]
    fn test_video_ids_from_flat_listing() {
        let stdout = r#"{"id": "dQw4w9WgXcQ", "url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ", "_type": "url"}
{"id": "UCabcdefghijklmnopqrstuv", "url": "https://www.youtube.com/channel/UCabc/videos", "_type": "url"}

not json
{"id": "aaaaaaaaaaa", "_type": "url"}"#;

        let entries = parse_json_lines(stdout);
        assert_eq!(entries.len(), 3);
        assert_eq!(
            video_ids_from_entries(&entries),
            vec!["dQw4w9WgXcQ", "aaaaaaaaaaa"]
        );
    }

    #[test]
    fn test_playlist_urls_from_flat_listing() {
        let entries = parse_json_lines(
            r#"{"id": "PLone", "url": "https://www.youtube.com/playlist?list=PLone"}
{"id": "PLtwo"}
{"id": "dQw4w9WgXcQ", "url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ"}"#,
        );

        assert_eq!(
            playlist_urls_from_entries(&entries),
            vec![
                "https://www.youtube.com/playlist?list=PLone",
                "https://www.youtube.com/playlist?list=PLtwo",
            ]
        );
    }
}
