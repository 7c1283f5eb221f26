//! Catalog enrichment through a chat-completion model.
//!
//! Each catalog entry is sent to the model once. Results are merged into a
//! separate output catalog, and progress is checkpointed every
//! `batch_size` entries so an interrupted pass can be resumed.

mod client;
mod parse;

pub use client::{ChatClient, Completer};
pub use parse::{build_prompt, failed_request, parse_reply};

use crate::config::{EnrichConfig, EnrichmentPrompts};
use crate::error::{Result, ShelfError};
use crate::rate_limit::RateLimiter;
use crate::store::{run_blocking, Catalog, CatalogEntry, CatalogStore, EnrichmentCheckpoint, Enrichment, JsonStore};
use indicatif::ProgressBar;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Lock-guarded enrichment checkpoint file.
pub type EnrichmentCheckpointStore = JsonStore<EnrichmentCheckpoint>;

/// Counts for one enrichment pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichSummary {
    pub total: usize,
    pub already_processed: usize,
    pub processed: usize,
    pub interrupted: bool,
    pub snapshot: Option<PathBuf>,
}

/// Runs enrichment passes over a catalog.
pub struct Enricher {
    completer: Arc<dyn Completer>,
    limiter: RateLimiter,
    prompts: EnrichmentPrompts,
    config: EnrichConfig,
    input: Arc<CatalogStore>,
    output: Arc<CatalogStore>,
    checkpoint: Arc<EnrichmentCheckpointStore>,
}

impl Enricher {
    pub fn new(config: EnrichConfig, prompts: EnrichmentPrompts, completer: Arc<dyn Completer>) -> Self {
        Self {
            completer,
            limiter: RateLimiter::new(config.rate_limit),
            prompts,
            input: Arc::new(CatalogStore::new(&config.input_path, config.lock_timeout)),
            output: Arc::new(CatalogStore::new(&config.output_path, config.lock_timeout)),
            checkpoint: Arc::new(EnrichmentCheckpointStore::new(
                &config.checkpoint_path,
                config.lock_timeout,
            )),
            config,
        }
    }

    /// Load the catalog to work on.
    ///
    /// When resuming, entries already handled are taken from the previous
    /// output so their results are kept.
    pub fn load_working_set(&self) -> (Catalog, Vec<String>) {
        let mut catalog = self.input.load();

        if !self.config.resume {
            return (catalog, Vec::new());
        }

        let processed = self.checkpoint.load().processed_ids;
        let previous = self.output.load();
        for id in &processed {
            if let Some(entry) = previous.get(id) {
                if catalog.contains_key(id) {
                    catalog.insert(id.clone(), entry.clone());
                }
            }
        }
        (catalog, processed)
    }

    /// Enrich every entry not yet processed.
    #[instrument(skip_all)]
    pub async fn run(&self, progress: &ProgressBar, cancel: &CancellationToken) -> Result<EnrichSummary> {
        let (mut catalog, mut processed_ids) = self.load_working_set();
        if catalog.is_empty() {
            return Err(ShelfError::Enrichment(format!(
                "No audiobook data loaded from {}",
                self.config.input_path.display()
            )));
        }

        let snapshot = match self.output.snapshot("augment") {
            Ok(path) => path,
            Err(e) => {
                warn!("Could not snapshot {}: {}", self.config.output_path.display(), e);
                None
            }
        };

        let done: HashSet<String> = processed_ids.iter().cloned().collect();
        let remaining: Vec<String> = catalog
            .keys()
            .filter(|id| !done.contains(*id))
            .cloned()
            .collect();

        let mut summary = EnrichSummary {
            total: catalog.len(),
            already_processed: catalog.len() - remaining.len(),
            snapshot,
            ..Default::default()
        };
        progress.set_length(remaining.len() as u64);

        let mut batch_count = 0;
        for id in remaining {
            if cancel.is_cancelled() {
                summary.interrupted = true;
                break;
            }
            let Some(entry) = catalog.get(&id) else {
                continue;
            };
            progress.set_message(short_title(&entry.title));

            let enrichment = tokio::select! {
                biased;
                e = self.enrich_entry(&id, entry) => e,
                _ = cancel.cancelled() => {
                    summary.interrupted = true;
                    break;
                }
            };

            if let Some(entry) = catalog.get_mut(&id) {
                entry.apply_enrichment(enrichment);
            }
            processed_ids.push(id);
            summary.processed += 1;
            batch_count += 1;

            if batch_count >= self.config.batch_size {
                self.save(&catalog, &processed_ids).await?;
                info!("Checkpoint saved after {} books", batch_count);
                batch_count = 0;
            }
            progress.inc(1);
        }

        self.save(&catalog, &processed_ids).await?;
        Ok(summary)
    }

    async fn enrich_entry(&self, id: &str, entry: &CatalogEntry) -> Enrichment {
        let user = build_prompt(&self.prompts.user, entry);

        self.limiter.wait().await;
        match self.completer.complete(&self.prompts.system, &user).await {
            Ok(content) => {
                let enrichment = parse_reply(&content);
                if enrichment.raw_response.is_some() {
                    warn!("Could not parse model response as JSON for {}", id);
                }
                enrichment
            }
            Err(e) => {
                warn!("API request failed for {}: {}", id, e);
                failed_request(&e.to_string())
            }
        }
    }

    async fn save(&self, catalog: &Catalog, processed_ids: &[String]) -> Result<()> {
        let checkpoint = Arc::clone(&self.checkpoint);
        let ids = EnrichmentCheckpoint {
            processed_ids: processed_ids.to_vec(),
        };
        run_blocking(move || checkpoint.save(&ids)).await?;

        let output = Arc::clone(&self.output);
        let data = catalog.clone();
        run_blocking(move || output.save(&data)).await?;
        Ok(())
    }
}

fn short_title(title: &str) -> String {
    if title.chars().count() > 40 {
        format!("{}...", title.chars().take(40).collect::<String>())
    } else {
        title.to_string()
    }
}
