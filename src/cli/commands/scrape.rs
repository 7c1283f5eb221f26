//! Scrape command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::{Output, ScrapeArgs};
use crate::config::{ScrapeConfig, Settings};
use crate::dispatcher::DispatchSummary;
use crate::orchestrator::{resume_target, Orchestrator, RunPlan};
use crate::store::CheckpointStore;
use anyhow::Result;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

use super::show_catalog_stats;

/// Run the default command: stats, or discovery plus extraction.
pub async fn run_scrape(
    args: &ScrapeArgs,
    mut settings: Settings,
    cancel: CancellationToken,
) -> Result<ExitCode> {
    args.apply(&mut settings);
    let config = ScrapeConfig::from_settings(&settings);

    if args.stats {
        show_catalog_stats(&config);
        return Ok(ExitCode::SUCCESS);
    }

    let url = match (&args.url, args.resume) {
        (Some(url), _) => url.trim().to_string(),
        (None, true) => {
            let checkpoint = CheckpointStore::new(&config.checkpoint_path, config.lock_timeout).load();
            match resume_target(&checkpoint) {
                Some(url) => {
                    Output::success(&format!("Resuming from: {}", url));
                    url
                }
                None => {
                    Output::warning("No checkpoint found to resume from.");
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        (None, false) => {
            Output::error("Please provide a YouTube URL (video, playlist, or channel)");
            Output::info("Run with --help for more information");
            return Ok(ExitCode::FAILURE);
        }
    };

    let operation = if config.download_audio {
        Operation::ScrapeWithAudio
    } else {
        Operation::Scrape
    };
    preflight::check(operation)?;

    let orchestrator = Orchestrator::new(config.clone());

    let spinner = Output::spinner("Discovering content...");
    let plan = orchestrator.plan(&url, &cancel).await?;
    spinner.finish_and_clear();

    if cancel.is_cancelled() {
        Output::warning("Interrupted during discovery. Nothing was processed.");
        return Ok(ExitCode::SUCCESS);
    }

    print_plan(&plan);
    if plan.queue.is_empty() {
        Output::warning("No new content to process");
        return Ok(ExitCode::SUCCESS);
    }

    let progress = Output::progress_bar(plan.queue.len() as u64, "Overall progress");
    let summary = orchestrator.execute(plan, &progress, &cancel).await;
    progress.finish_and_clear();

    print_summary(&summary);

    if summary.was_interrupted() {
        Output::warning("Interrupt received. Progress has been saved and can be resumed with --resume.");
    } else {
        if summary.failures.is_empty() {
            Output::success("All items completed successfully!");
        } else {
            Output::warning("Some items failed. Run again with --resume to retry them.");
        }
        show_catalog_stats(&config);
    }

    Ok(ExitCode::SUCCESS)
}

fn print_plan(plan: &RunPlan) {
    Output::header("Content Summary");
    Output::kv("Videos discovered", &plan.discovered.to_string());
    Output::kv("Already processed", &plan.already_processed.to_string());
    Output::kv("New to process", &plan.new.to_string());
    if let Some(url) = &plan.resume_from {
        Output::kv("Resuming from", url);
    }
    println!();
}

fn print_summary(summary: &DispatchSummary) {
    Output::header("Run Summary");
    Output::kv("Added", &summary.added.to_string());
    Output::kv("Already in catalog", &summary.already_present.to_string());
    Output::kv("Filtered by duration", &summary.filtered.to_string());
    Output::kv("Failed", &summary.failures.len().to_string());
    if summary.cancelled > 0 {
        Output::kv("Not started", &summary.cancelled.to_string());
    }

    for failure in &summary.failures {
        Output::list_item(&format!("{} [{}]: {}", failure.url, failure.kind, failure.error));
    }
}
