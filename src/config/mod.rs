//! Configuration module for audioshelf.
//!
//! Handles loading application settings and prompt templates, and folding them
//! into the immutable per-run configuration.

mod prompts;
mod run;
mod settings;

pub use prompts::{EnrichmentPrompts, Prompts};
pub use run::{seconds, DurationFilter, EnrichConfig, RetryPolicy, ScrapeConfig};
pub use settings::{
    EnrichmentSettings, GeneralSettings, PromptSettings, ScraperSettings, Settings,
};
