//! Pipeline orchestrator for audioshelf.
//!
//! Coordinates a scraping run: discovery from a root URL, resume planning
//! against the checkpoint, and dispatch of the remaining work.

use crate::config::ScrapeConfig;
use crate::discovery::Discoverer;
use crate::dispatcher::{DispatchSummary, Dispatcher};
use crate::error::{Result, ShelfError};
use crate::extractor::MetadataExtractor;
use crate::rate_limit::RateLimiter;
use crate::source::{VideoSource, YtDlpSource};
use crate::store::{run_blocking, CatalogStore, Checkpoint, CheckpointStore, Txn};
use indicatif::ProgressBar;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// What a run will do, computed before any extraction starts.
#[derive(Debug, Clone, PartialEq)]
pub struct RunPlan {
    /// Number of distinct videos discovered.
    pub discovered: usize,
    /// Discovered videos that the checkpoint already lists.
    pub already_processed: usize,
    /// Discovered videos not yet processed.
    pub new: usize,
    /// Checkpoint boundary that is re-run first, if it was discovered.
    pub resume_from: Option<String>,
    /// URLs to dispatch, in order.
    pub queue: Vec<String>,
}

/// The main orchestrator for a scraping run.
pub struct Orchestrator {
    discoverer: Discoverer,
    dispatcher: Dispatcher,
    checkpoint: Arc<CheckpointStore>,
}

impl Orchestrator {
    /// Create an orchestrator backed by `yt-dlp`.
    pub fn new(config: ScrapeConfig) -> Self {
        let source = Arc::new(YtDlpSource::new(
            config.socket_timeout,
            config.user_agent.clone(),
        ));
        Self::with_source(config, source)
    }

    /// Create an orchestrator with a custom video source.
    pub fn with_source(config: ScrapeConfig, source: Arc<dyn VideoSource>) -> Self {
        let config = Arc::new(config);
        let limiter = Arc::new(RateLimiter::new(config.rate_limit));
        let catalog = Arc::new(CatalogStore::new(&config.catalog_path, config.lock_timeout));
        let checkpoint = Arc::new(CheckpointStore::new(
            &config.checkpoint_path,
            config.lock_timeout,
        ));

        let discoverer = Discoverer::new(source.clone(), limiter.clone(), config.max_depth);
        let extractor = Arc::new(MetadataExtractor::new(
            source,
            catalog,
            limiter,
            config.clone(),
        ));
        let dispatcher = Dispatcher::new(extractor, checkpoint.clone(), config.workers);

        Self {
            discoverer,
            dispatcher,
            checkpoint,
        }
    }

    pub fn checkpoint_store(&self) -> &CheckpointStore {
        &self.checkpoint
    }

    /// Discover everything under `url` and work out what is left to do.
    ///
    /// The root URL is remembered in the checkpoint so an interrupted run can
    /// be resumed without repeating it. If the checkpoint is locked or
    /// unreadable the run goes ahead on whatever `load` can recover.
    ///
    /// Cancelling `cancel` cuts discovery short; the plan then only covers
    /// what was found so far.
    #[instrument(skip(self, cancel))]
    pub async fn plan(&self, url: &str, cancel: &CancellationToken) -> Result<RunPlan> {
        let checkpoint = match self.remember_source(url).await {
            Ok(checkpoint) => checkpoint,
            Err(e @ (ShelfError::LockTimeout(_) | ShelfError::CorruptStore { .. })) => {
                warn!("Could not record source URL in checkpoint: {}", e);
                let store = Arc::clone(&self.checkpoint);
                run_blocking(move || Ok(store.load())).await?
            }
            Err(e) => return Err(e),
        };
        if let Some(last) = &checkpoint.last_url {
            info!("Resuming from checkpoint: {}", last);
        }

        let discovered = self.discoverer.discover(url, cancel).await;
        let processed = checkpoint.processed_set();
        let already_processed = discovered
            .iter()
            .filter(|u| processed.contains(u.as_str()))
            .count();

        let queue = checkpoint.plan(&discovered);
        let resume_from = checkpoint
            .last_url
            .clone()
            .filter(|u| discovered.contains(u));

        Ok(RunPlan {
            discovered: discovered.len(),
            already_processed,
            new: discovered.len() - already_processed,
            resume_from,
            queue,
        })
    }

    /// Dispatch a planned queue.
    pub async fn execute(
        &self,
        plan: RunPlan,
        progress: &ProgressBar,
        cancel: &CancellationToken,
    ) -> DispatchSummary {
        self.dispatcher.run(plan.queue, progress, cancel).await
    }

    async fn remember_source(&self, url: &str) -> Result<Checkpoint> {
        let store = Arc::clone(&self.checkpoint);
        let url = url.to_string();
        run_blocking(move || {
            store.update(|cp| {
                if cp.source_url.as_deref() == Some(url.as_str()) {
                    Txn::Abort(cp.clone())
                } else {
                    cp.source_url = Some(url);
                    Txn::Commit(cp.clone())
                }
            })
        })
        .await
    }
}

/// The URL a `--resume` run without an explicit URL should start from.
pub fn resume_target(checkpoint: &Checkpoint) -> Option<String> {
    checkpoint
        .source_url
        .clone()
        .or_else(|| checkpoint.last_url.clone())
}
