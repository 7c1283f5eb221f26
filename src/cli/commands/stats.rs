//! Catalog and augmentation statistics display.

use crate::cli::{format_duration, Output};
use crate::config::{EnrichConfig, ScrapeConfig};
use crate::stats::{AugmentStats, CatalogStats};
use crate::store::CatalogStore;

/// Print library statistics for the scrape catalog.
pub fn show_catalog_stats(config: &ScrapeConfig) {
    let catalog = CatalogStore::new(&config.catalog_path, config.lock_timeout).load();
    if catalog.is_empty() {
        Output::warning("No audiobooks have been cataloged yet.");
        return;
    }

    let stats = CatalogStats::compute(&catalog);

    Output::header("Audiobook Library Statistics");
    Output::kv("Total audiobooks", &stats.total.to_string());
    Output::kv("Total duration", &format_duration(stats.total_duration));
    Output::kv("Average duration", &format_duration(stats.average_duration()));
    Output::kv("Channels", &stats.channels.to_string());
    Output::ratio("Processed", stats.processed, stats.processed_ratio());

    if let Some(longest) = &stats.longest {
        Output::kv(
            "Longest",
            &format!("{} ({})", longest.title, format_duration(longest.duration)),
        );
    }
    if let Some(shortest) = &stats.shortest {
        Output::kv(
            "Shortest",
            &format!("{} ({})", shortest.title, format_duration(shortest.duration)),
        );
    }

    if !stats.recent.is_empty() {
        Output::header("Recently Added");
        for entry in &stats.recent {
            Output::entry(&entry.title, &entry.id, &entry.download_date);
        }
    }
}

/// Print enrichment progress for the augmented catalog.
///
/// Reads the output catalog, falling back to the input when no output
/// exists yet.
pub fn show_augment_stats(config: &EnrichConfig) {
    let mut catalog = CatalogStore::new(&config.output_path, config.lock_timeout).load();
    if catalog.is_empty() {
        catalog = CatalogStore::new(&config.input_path, config.lock_timeout).load();
    }
    if catalog.is_empty() {
        Output::warning("No audiobooks found in the metadata file.");
        return;
    }

    let stats = AugmentStats::compute(&catalog);

    Output::header("Augmentation Progress");
    Output::kv("Total audiobooks", &stats.total.to_string());
    Output::ratio("Augmented", stats.augmented, stats.augmented_ratio());
    Output::kv("Remaining", &stats.remaining().to_string());

    if !stats.top_authors.is_empty() {
        Output::header("Top Authors");
        for (author, count) in &stats.top_authors {
            Output::list_item(&format!("{} ({})", author, count));
        }
    }
}
