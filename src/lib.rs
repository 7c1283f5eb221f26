//! audioshelf - YouTube audiobook catalog builder
//!
//! Builds a local JSON catalog of audiobook videos from a video, playlist or
//! channel URL, and optionally enriches it with book details from a local
//! language model.
//!
//! # Overview
//!
//! audioshelf allows you to:
//! - Discover every video under a channel or playlist, recursively
//! - Record metadata, description-derived transcripts and optional audio
//! - Resume interrupted runs from a checkpoint
//! - Fill in real titles, authors and synopses with an OpenAI-compatible model
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `source` - Video listing and metadata abstraction (yt-dlp)
//! - `discovery` - Recursive URL expansion
//! - `extractor` - Per-video metadata extraction
//! - `dispatcher` - Bounded concurrent processing
//! - `store` - Lock-guarded JSON persistence
//! - `audio` - Audio download and processing
//! - `enrich` - LLM enrichment
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use audioshelf::config::{ScrapeConfig, Settings};
//! use audioshelf::orchestrator::Orchestrator;
//! use indicatif::ProgressBar;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(ScrapeConfig::from_settings(&settings));
//!
//!     let cancel = CancellationToken::new();
//!     let plan = orchestrator.plan("https://www.youtube.com/@LibriVox", &cancel).await?;
//!     let summary = orchestrator
//!         .execute(plan, &ProgressBar::hidden(), &cancel)
//!         .await;
//!     println!("Added {} entries", summary.added);
//!
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod dispatcher;
pub mod enrich;
pub mod error;
pub mod extractor;
pub mod openai;
pub mod orchestrator;
pub mod rate_limit;
pub mod source;
pub mod stats;
pub mod store;
pub mod transcript;
