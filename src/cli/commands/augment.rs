//! Augment command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::{AugmentArgs, Output};
use crate::config::{EnrichConfig, Prompts, Settings};
use crate::enrich::{ChatClient, Enricher};
use crate::error::ShelfError;
use anyhow::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::show_augment_stats;

/// Run the augment command.
pub async fn run_augment(
    args: &AugmentArgs,
    mut settings: Settings,
    cancel: CancellationToken,
) -> Result<()> {
    args.apply(&mut settings);
    let config = EnrichConfig::from_settings(&settings, args.resume);

    if args.stats {
        show_augment_stats(&config);
        return Ok(());
    }

    preflight::check(Operation::Augment)?;

    let prompts = Prompts::load(settings.prompts.custom_dir.as_deref())?;
    let client = ChatClient::new(
        &config.api_base,
        &config.model,
        config.temperature,
        config.timeout,
    )?;

    Output::info(&format!(
        "Loading audiobook data from {}",
        config.input_path.display()
    ));
    Output::kv("Model", &config.model);
    Output::kv("Endpoint", &config.api_base);

    let enricher = Enricher::new(config.clone(), prompts.enrichment, Arc::new(client));

    let progress = Output::progress_bar(0, "Augmenting audiobooks...");
    let result = enricher.run(&progress, &cancel).await;
    progress.finish_and_clear();

    let summary = match result {
        Ok(summary) => summary,
        Err(ShelfError::Enrichment(msg)) => {
            Output::error(&msg);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(path) = &summary.snapshot {
        Output::kv("Previous output saved to", &path.display().to_string());
    }
    Output::header("Processing Summary");
    Output::kv("Total books", &summary.total.to_string());
    Output::kv("Already processed", &summary.already_processed.to_string());
    Output::kv("Processed this run", &summary.processed.to_string());

    if summary.interrupted {
        Output::warning("Interrupt received. Progress has been saved and can be resumed with --resume.");
        return Ok(());
    }

    Output::success(&format!(
        "Augmentation complete! Data saved to {}",
        config.output_path.display()
    ));
    show_augment_stats(&config);
    Ok(())
}
