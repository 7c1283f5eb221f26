//! Bounded concurrent dispatch of extraction work.

use crate::error::FailureKind;
use crate::extractor::{ItemOutcome, MetadataExtractor};
use crate::store::{run_blocking, CheckpointStore, Txn};
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// A URL that could not be processed.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemFailure {
    pub url: String,
    pub kind: FailureKind,
    pub error: String,
}

/// Counts per outcome for one dispatch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchSummary {
    pub total: usize,
    pub added: usize,
    pub already_present: usize,
    pub filtered: usize,
    pub cancelled: usize,
    pub failures: Vec<ItemFailure>,
}

impl DispatchSummary {
    pub fn succeeded(&self) -> usize {
        self.added + self.already_present + self.filtered
    }

    pub fn was_interrupted(&self) -> bool {
        self.cancelled > 0
    }

    fn record(&mut self, url: String, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Added { .. } => self.added += 1,
            ItemOutcome::AlreadyPresent { .. } => self.already_present += 1,
            ItemOutcome::Filtered { .. } => self.filtered += 1,
            ItemOutcome::Cancelled => self.cancelled += 1,
            ItemOutcome::Failed { kind, error } => {
                self.failures.push(ItemFailure { url, kind, error })
            }
        }
    }
}

/// Runs extractions with at most `workers` in flight and checkpoints
/// every success.
pub struct Dispatcher {
    extractor: Arc<MetadataExtractor>,
    checkpoint: Arc<CheckpointStore>,
    workers: usize,
}

impl Dispatcher {
    pub fn new(extractor: Arc<MetadataExtractor>, checkpoint: Arc<CheckpointStore>, workers: usize) -> Self {
        Self {
            extractor,
            checkpoint,
            workers,
        }
    }

    /// Process `urls`, advancing `progress` once per completed item.
    pub async fn run(
        &self,
        urls: Vec<String>,
        progress: &ProgressBar,
        cancel: &CancellationToken,
    ) -> DispatchSummary {
        let mut summary = DispatchSummary {
            total: urls.len(),
            ..Default::default()
        };

        if self.workers <= 1 || urls.len() <= 1 {
            for url in urls {
                let outcome = self.process(&url, cancel).await;
                self.complete(url, outcome, &mut summary).await;
                progress.inc(1);
            }
        } else {
            info!("Processing {} URLs with {} workers", urls.len(), self.workers);
            let mut completions = stream::iter(urls)
                .map(|url| async move {
                    let outcome = self.process(&url, cancel).await;
                    (url, outcome)
                })
                .buffer_unordered(self.workers);

            while let Some((url, outcome)) = completions.next().await {
                self.complete(url, outcome, &mut summary).await;
                progress.inc(1);
            }
        }

        summary
    }

    async fn process(&self, url: &str, cancel: &CancellationToken) -> ItemOutcome {
        if cancel.is_cancelled() {
            return ItemOutcome::Cancelled;
        }
        self.extractor.extract(url, cancel).await
    }

    async fn complete(&self, url: String, outcome: ItemOutcome, summary: &mut DispatchSummary) {
        if outcome.is_success() {
            self.checkpoint_url(&url).await;
        }
        summary.record(url, outcome);
    }

    async fn checkpoint_url(&self, url: &str) {
        let checkpoint = Arc::clone(&self.checkpoint);
        let owned = url.to_string();
        let result = run_blocking(move || {
            checkpoint.update(|cp| {
                cp.record(&owned);
                Txn::Commit(())
            })
        })
        .await;

        if let Err(e) = result {
            warn!("Checkpoint not updated for {} ({}): {}", url, e.kind(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::tests::test_config;
    use crate::rate_limit::RateLimiter;
    use crate::source::testing::{Failure, ScriptedSource};
    use crate::store::CatalogStore;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn video_url(n: usize) -> String {
        format!("https://www.youtube.com/watch?v=video{:06}", n)
    }

    fn setup(
        source: ScriptedSource,
        dir: &std::path::Path,
        workers: usize,
    ) -> (Dispatcher, Arc<ScriptedSource>, Arc<CatalogStore>, Arc<CheckpointStore>) {
        let config = test_config(dir);
        let source = Arc::new(source);
        let catalog = Arc::new(CatalogStore::new(&config.catalog_path, config.lock_timeout));
        let checkpoint = Arc::new(CheckpointStore::new(&config.checkpoint_path, config.lock_timeout));
        let extractor = Arc::new(MetadataExtractor::new(
            source.clone(),
            catalog.clone(),
            Arc::new(RateLimiter::disabled()),
            Arc::new(config),
        ));
        (
            Dispatcher::new(extractor, checkpoint.clone(), workers),
            source,
            catalog,
            checkpoint,
        )
    }

    fn scripted(count: usize) -> ScriptedSource {
        (0..count).fold(ScriptedSource::new(), |s, n| {
            s.with_video(&video_url(n), &format!("video{:06}", n), 600.0)
        })
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let source = scripted(12).with_fetch_delay(Duration::from_millis(20));
        let (dispatcher, source, catalog, checkpoint) = setup(source, dir.path(), 3);

        let urls: Vec<String> = (0..12).map(video_url).collect();
        let summary = dispatcher
            .run(urls.clone(), &ProgressBar::hidden(), &CancellationToken::new())
            .await;

        assert_eq!(summary.total, 12);
        assert_eq!(summary.added, 12);
        assert!(summary.failures.is_empty());

        let peak = source.max_in_flight.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak concurrency {}", peak);
        assert!(peak > 1, "expected overlap, got {}", peak);

        assert_eq!(catalog.load().len(), 12);
        let cp = checkpoint.load();
        let mut recorded = cp.processed_urls.clone();
        recorded.sort();
        assert_eq!(recorded, urls);
        assert!(cp.last_url.is_some());
    }

    #[tokio::test]
    async fn test_sequential_with_single_worker() {
        let dir = tempfile::tempdir().unwrap();
        let source = scripted(4).with_fetch_delay(Duration::from_millis(5));
        let (dispatcher, source, _, checkpoint) = setup(source, dir.path(), 1);

        let urls: Vec<String> = (0..4).map(video_url).collect();
        let progress = ProgressBar::hidden();
        dispatcher.run(urls.clone(), &progress, &CancellationToken::new()).await;

        assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(progress.position(), 4);
        // Sequential runs checkpoint in input order.
        assert_eq!(checkpoint.load().processed_urls, urls);
        assert_eq!(checkpoint.load().last_url, Some(video_url(3)));
    }

    #[tokio::test]
    async fn test_failures_are_isolated_and_not_checkpointed() {
        let dir = tempfile::tempdir().unwrap();
        let source = scripted(3).failing(&video_url(1), 1, Failure::Permanent);
        let (dispatcher, _, catalog, checkpoint) = setup(source, dir.path(), 2);

        let urls: Vec<String> = (0..3).map(video_url).collect();
        let summary = dispatcher
            .run(urls, &ProgressBar::hidden(), &CancellationToken::new())
            .await;

        assert_eq!(summary.added, 2);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].url, video_url(1));
        assert_eq!(summary.failures[0].kind, FailureKind::Permanent);

        assert_eq!(catalog.load().len(), 2);
        assert!(!checkpoint.load().is_processed(&video_url(1)));
    }

    #[tokio::test]
    async fn test_cancelled_before_start_processes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (dispatcher, source, catalog, checkpoint) = setup(scripted(5), dir.path(), 2);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let urls: Vec<String> = (0..5).map(video_url).collect();
        let progress = ProgressBar::hidden();
        let summary = dispatcher.run(urls, &progress, &cancel).await;

        assert_eq!(summary.cancelled, 5);
        assert!(summary.was_interrupted());
        assert_eq!(progress.position(), 5);
        assert_eq!(source.fetches(), 0);
        assert!(catalog.load().is_empty());
        assert!(checkpoint.load().processed_urls.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_mid_run_keeps_completed_work() {
        let dir = tempfile::tempdir().unwrap();
        let source = scripted(20).with_fetch_delay(Duration::from_millis(30));
        let (dispatcher, _, catalog, checkpoint) = setup(source, dir.path(), 2);

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let urls: Vec<String> = (0..20).map(video_url).collect();
        let summary = dispatcher.run(urls, &ProgressBar::hidden(), &cancel).await;

        assert!(summary.was_interrupted());
        assert_eq!(summary.added + summary.cancelled, 20);

        let stored = catalog.load();
        let cp = checkpoint.load();
        assert_eq!(cp.processed_urls.len(), summary.added);
        for url in &cp.processed_urls {
            let id = url.rsplit("v=").next().unwrap();
            assert!(stored.contains_key(id));
        }
    }
}
