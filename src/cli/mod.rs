//! CLI module for audioshelf.

pub mod commands;
mod output;
pub mod preflight;

pub use output::{format_duration, Output};

use crate::config::Settings;
use clap::{Args, Parser, Subcommand};

/// audioshelf - YouTube audiobook catalog builder
///
/// Discovers videos from a video, playlist or channel URL and records their
/// metadata in a local JSON catalog. Interrupted runs can be resumed.
#[derive(Parser, Debug)]
#[command(name = "audioshelf")]
#[command(version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "AUDIOSHELF_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub scrape: ScrapeArgs,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fill in real title, author, synopsis and genre using a local LLM
    Augment(AugmentArgs),
}

/// Options for the default scraping command.
#[derive(Args, Debug, Default, Clone)]
pub struct ScrapeArgs {
    /// YouTube URL (video, playlist, or channel)
    pub url: Option<String>,

    /// Display statistics about the catalog
    #[arg(long)]
    pub stats: bool,

    /// Resume from the last checkpoint
    #[arg(long)]
    pub resume: bool,

    /// Maximum depth for recursive scraping
    #[arg(long, env = "AUDIOSHELF_DEPTH")]
    pub depth: Option<u32>,

    /// Number of parallel workers
    #[arg(long, env = "AUDIOSHELF_WORKERS")]
    pub workers: Option<usize>,

    /// Minimum video duration in seconds (0 = no limit)
    #[arg(long, env = "AUDIOSHELF_MIN_DURATION")]
    pub min_duration: Option<u64>,

    /// Maximum video duration in seconds (0 = no limit)
    #[arg(long, env = "AUDIOSHELF_MAX_DURATION")]
    pub max_duration: Option<u64>,

    /// Minimum seconds between requests
    #[arg(long, env = "AUDIOSHELF_RATE_LIMIT")]
    pub rate_limit: Option<f64>,

    /// Disable transcript extraction from descriptions
    #[arg(long)]
    pub no_transcript: bool,

    /// Also download each video's audio track
    #[arg(long)]
    pub download_audio: bool,

    /// Directory for downloaded audio
    #[arg(long, env = "AUDIOSHELF_OUTPUT_DIR")]
    pub output_dir: Option<String>,

    /// Catalog JSON file
    #[arg(long, env = "AUDIOSHELF_CATALOG")]
    pub catalog: Option<String>,

    /// Checkpoint JSON file
    #[arg(long, env = "AUDIOSHELF_CHECKPOINT")]
    pub checkpoint: Option<String>,
}

impl ScrapeArgs {
    /// Overlay command-line values onto the loaded settings.
    pub fn apply(&self, settings: &mut Settings) {
        let s = &mut settings.scraper;
        if let Some(depth) = self.depth {
            s.recursive_depth = depth;
        }
        if let Some(workers) = self.workers {
            s.max_workers = workers;
        }
        if let Some(min) = self.min_duration {
            s.min_duration = min;
        }
        if let Some(max) = self.max_duration {
            s.max_duration = max;
        }
        if let Some(rate) = self.rate_limit {
            s.rate_limit = rate;
        }
        if self.no_transcript {
            s.extract_description = false;
        }
        if self.download_audio {
            s.download_audio = true;
        }
        if let Some(dir) = &self.output_dir {
            s.output_dir = dir.clone();
        }
        if let Some(file) = &self.catalog {
            s.catalog_file = file.clone();
        }
        if let Some(file) = &self.checkpoint {
            s.checkpoint_file = file.clone();
        }
    }
}

/// Options for `audioshelf augment`.
#[derive(Args, Debug, Default, Clone)]
pub struct AugmentArgs {
    /// Input catalog JSON file
    #[arg(long)]
    pub input: Option<String>,

    /// Output catalog JSON file
    #[arg(long)]
    pub output: Option<String>,

    /// Resume from the last checkpoint
    #[arg(long)]
    pub resume: bool,

    /// Entries processed between checkpoint saves
    #[arg(long, env = "AUDIOSHELF_BATCH")]
    pub batch: Option<usize>,

    /// Seconds between API calls
    #[arg(long, env = "AUDIOSHELF_AUGMENT_RATE_LIMIT")]
    pub rate_limit: Option<f64>,

    /// Base URL of the OpenAI-compatible API
    #[arg(long, env = "AUDIOSHELF_API_URL")]
    pub api_url: Option<String>,

    /// Model name sent to the API
    #[arg(long, env = "AUDIOSHELF_MODEL")]
    pub model: Option<String>,

    /// Display augmentation statistics
    #[arg(long)]
    pub stats: bool,
}

impl AugmentArgs {
    pub fn apply(&self, settings: &mut Settings) {
        let e = &mut settings.enrichment;
        if let Some(input) = &self.input {
            e.input_file = input.clone();
        }
        if let Some(output) = &self.output {
            e.output_file = output.clone();
        }
        if let Some(batch) = self.batch {
            e.batch_size = batch;
        }
        if let Some(rate) = self.rate_limit {
            e.rate_limit = rate;
        }
        if let Some(url) = &self.api_url {
            e.api_base = url.clone();
        }
        if let Some(model) = &self.model {
            e.model = model.clone();
        }
    }
}
