//! CLI command implementations.

mod augment;
mod scrape;
mod stats;

pub use augment::run_augment;
pub use scrape::run_scrape;
pub use stats::{show_augment_stats, show_catalog_stats};
