//! Catalog statistics.

use crate::store::{Catalog, CatalogEntry};
use std::collections::{BTreeMap, HashSet};

/// Number of recent entries reported.
const RECENT_COUNT: usize = 5;

/// Number of authors in the augmentation report.
const TOP_AUTHORS: usize = 10;

/// A catalog entry referenced from a report.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryRef {
    pub id: String,
    pub title: String,
    pub duration: f64,
    pub download_date: String,
}

impl EntryRef {
    fn new(id: &str, entry: &CatalogEntry) -> Self {
        Self {
            id: id.to_string(),
            title: entry.title.clone(),
            duration: entry.duration,
            download_date: entry.download_date.clone(),
        }
    }
}

/// Library-wide aggregates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogStats {
    pub total: usize,
    pub total_duration: f64,
    pub channels: usize,
    pub processed: usize,
    pub longest: Option<EntryRef>,
    pub shortest: Option<EntryRef>,
    pub recent: Vec<EntryRef>,
}

impl CatalogStats {
    pub fn compute(catalog: &Catalog) -> Self {
        let channels: HashSet<&str> = catalog.values().map(|e| e.channel.as_str()).collect();

        let timed = || catalog.iter().filter(|(_, e)| e.duration > 0.0);
        let longest = timed()
            .max_by(|a, b| a.1.duration.total_cmp(&b.1.duration))
            .map(|(id, e)| EntryRef::new(id, e));
        let shortest = timed()
            .min_by(|a, b| a.1.duration.total_cmp(&b.1.duration))
            .map(|(id, e)| EntryRef::new(id, e));

        let mut dated: Vec<(&String, &CatalogEntry)> = catalog
            .iter()
            .filter(|(_, e)| !e.download_date.is_empty())
            .collect();
        dated.sort_by(|a, b| b.1.download_date.cmp(&a.1.download_date));

        Self {
            total: catalog.len(),
            total_duration: catalog.values().map(|e| e.duration).sum(),
            channels: channels.len(),
            processed: catalog.values().filter(|e| e.processed).count(),
            longest,
            shortest,
            recent: dated
                .into_iter()
                .take(RECENT_COUNT)
                .map(|(id, e)| EntryRef::new(id, e))
                .collect(),
        }
    }

    pub fn average_duration(&self) -> f64 {
        self.total_duration / self.total.max(1) as f64
    }

    pub fn processed_ratio(&self) -> f64 {
        self.processed as f64 / self.total.max(1) as f64
    }
}

/// Progress of the enrichment pass over a catalog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AugmentStats {
    pub total: usize,
    pub augmented: usize,
    /// Most frequent authors, by count and then name.
    pub top_authors: Vec<(String, usize)>,
}

impl AugmentStats {
    pub fn compute(catalog: &Catalog) -> Self {
        let mut authors: BTreeMap<&str, usize> = BTreeMap::new();
        for author in catalog
            .values()
            .filter_map(|e| e.real_author.as_deref())
            .filter(|a| !a.is_empty())
        {
            *authors.entry(author).or_default() += 1;
        }

        let mut top_authors: Vec<(String, usize)> = authors
            .into_iter()
            .map(|(a, n)| (a.to_string(), n))
            .collect();
        // Stable sort keeps the alphabetical order among equal counts.
        top_authors.sort_by(|a, b| b.1.cmp(&a.1));
        top_authors.truncate(TOP_AUTHORS);

        Self {
            total: catalog.len(),
            augmented: catalog.values().filter(|e| e.is_augmented()).count(),
            top_authors,
        }
    }

    pub fn remaining(&self) -> usize {
        self.total - self.augmented
    }

    pub fn augmented_ratio(&self) -> f64 {
        self.augmented as f64 / self.total.max(1) as f64
    }
}
