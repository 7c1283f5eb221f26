//! Per-video metadata extraction.
//!
//! [`MetadataExtractor::extract`] takes one video URL through validation,
//! rate-limited fetching with retry, duration filtering, transcript
//! extraction, optional audio download and a single catalog transaction.
//! Every path ends in an [`ItemOutcome`]; no error escapes.

use crate::audio::{self, AudioTarget};
use crate::config::ScrapeConfig;
use crate::error::{FailureKind, Result, ShelfError};
use crate::rate_limit::RateLimiter;
use crate::source::{is_youtube_url, video_id_from_url, VideoInfo, VideoSource};
use crate::store::{run_blocking, CatalogEntry, CatalogStore, Txn};
use crate::transcript;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Result of processing one URL.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    /// A new catalog entry was written.
    Added { id: String, title: String },
    /// The id was already in the catalog.
    AlreadyPresent { id: String },
    /// Rejected by the duration filter. Nothing written.
    Filtered { reason: &'static str },
    Failed { kind: FailureKind, error: String },
    /// Interrupted before completion.
    Cancelled,
}

impl ItemOutcome {
    /// Whether the URL counts as done and belongs in the checkpoint.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            ItemOutcome::Added { .. } | ItemOutcome::AlreadyPresent { .. } | ItemOutcome::Filtered { .. }
        )
    }

    fn failed(error: ShelfError) -> Self {
        if matches!(error, ShelfError::Cancelled) {
            return ItemOutcome::Cancelled;
        }
        ItemOutcome::Failed {
            kind: error.kind(),
            error: error.to_string(),
        }
    }
}

/// Extracts metadata for single videos into the catalog.
pub struct MetadataExtractor {
    source: Arc<dyn VideoSource>,
    catalog: Arc<CatalogStore>,
    limiter: Arc<RateLimiter>,
    config: Arc<ScrapeConfig>,
}

impl MetadataExtractor {
    pub fn new(
        source: Arc<dyn VideoSource>,
        catalog: Arc<CatalogStore>,
        limiter: Arc<RateLimiter>,
        config: Arc<ScrapeConfig>,
    ) -> Self {
        Self {
            source,
            catalog,
            limiter,
            config,
        }
    }

    /// Process one URL.
    #[instrument(skip(self, cancel))]
    pub async fn extract(&self, url: &str, cancel: &CancellationToken) -> ItemOutcome {
        if !is_youtube_url(url) {
            warn!("Invalid YouTube URL: {}", url);
            return ItemOutcome::failed(ShelfError::InvalidUrl(url.to_string()));
        }

        let outcome = match self.run(url, cancel).await {
            Ok(outcome) => outcome,
            Err(e) => ItemOutcome::failed(e),
        };

        match &outcome {
            ItemOutcome::Added { id, title } => {
                info!("Successfully extracted metadata for {}: {}", id, title)
            }
            ItemOutcome::AlreadyPresent { id } => info!("Skipping {} - already exists", id),
            ItemOutcome::Filtered { reason } => info!("Skipping {} - {}", url, reason),
            ItemOutcome::Failed { kind, error } => warn!("Failed ({}) {}: {}", kind, url, error),
            ItemOutcome::Cancelled => debug!("Cancelled {}", url),
        }
        outcome
    }

    async fn run(&self, url: &str, cancel: &CancellationToken) -> Result<ItemOutcome> {
        let info = self.fetch_with_retry(url, cancel).await?;

        let duration = info.duration_seconds();
        if let Some(reason) = self.config.durations.rejection(duration) {
            return Ok(ItemOutcome::Filtered { reason });
        }

        let id = info
            .id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| video_id_from_url(url));

        if self.is_cataloged(&id).await? {
            return Ok(ItemOutcome::AlreadyPresent { id });
        }

        let mut entry = self.build_entry(url, &info);

        if self.config.download_audio {
            let target = AudioTarget {
                format: self.config.audio_format.clone(),
                bitrate: self.config.bitrate.clone(),
            };
            let path = tokio::select! {
                _ = cancel.cancelled() => return Err(ShelfError::Cancelled),
                r = audio::download_audio(url, &id, &self.config.output_dir, &target) => r?,
            };
            entry.audio_metadata = match audio::probe_audio(&path).await {
                Ok(meta) => Some(meta),
                Err(e) => {
                    warn!("Could not read audio metadata for {}: {}", id, e);
                    None
                }
            };
            entry.audio_file = path.to_string_lossy().into_owned();
        }

        let title = entry.title.clone();
        if self.persist(id.clone(), entry).await? {
            Ok(ItemOutcome::Added { id, title })
        } else {
            Ok(ItemOutcome::AlreadyPresent { id })
        }
    }

    /// Fetch metadata, retrying transient failures with exponential backoff.
    async fn fetch_with_retry(&self, url: &str, cancel: &CancellationToken) -> Result<VideoInfo> {
        let policy = self.config.retry;
        let mut attempt = 0;

        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => return Err(ShelfError::Cancelled),
                r = async {
                    self.limiter.wait().await;
                    self.source.fetch_video(url).await
                } => r,
            };

            match result {
                Ok(info) => return Ok(info),
                Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                    attempt += 1;
                    let delay = policy.delay_for(attempt);
                    warn!(
                        "Retry attempt {}/{} for {} in {:?}: {}",
                        attempt, policy.max_retries, url, delay, e
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(ShelfError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn is_cataloged(&self, id: &str) -> Result<bool> {
        let catalog = Arc::clone(&self.catalog);
        let id = id.to_string();
        run_blocking(move || Ok(catalog.load().contains_key(&id))).await
    }

    /// Insert the entry unless another worker got there first.
    async fn persist(&self, id: String, entry: CatalogEntry) -> Result<bool> {
        let catalog = Arc::clone(&self.catalog);
        run_blocking(move || {
            catalog.update(|c| {
                if c.contains_key(&id) {
                    Txn::Abort(false)
                } else {
                    c.insert(id, entry);
                    Txn::Commit(true)
                }
            })
        })
        .await
    }

    fn build_entry(&self, url: &str, info: &VideoInfo) -> CatalogEntry {
        let description = info.description.clone().unwrap_or_default();
        let transcript = if self.config.extract_transcript {
            transcript::from_description(&description)
        } else {
            String::new()
        };

        CatalogEntry {
            title: info.title.clone().unwrap_or_else(|| "Unknown".to_string()),
            channel: info.channel.clone().unwrap_or_else(|| "Unknown".to_string()),
            channel_url: info.channel_url.clone().unwrap_or_default(),
            duration: info.duration_seconds(),
            upload_date: info
                .upload_date
                .clone()
                .unwrap_or_else(|| "Unknown".to_string()),
            description,
            transcript,
            view_count: info.view_count,
            like_count: info.like_count,
            download_date: chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            url: url.to_string(),
            thumbnail: info.thumbnail.clone().unwrap_or_default(),
            tags: info.tags.clone(),
            categories: info.categories.clone(),
            ..Default::default()
        }
    }
}
