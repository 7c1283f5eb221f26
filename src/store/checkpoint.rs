//! Run checkpoints used to resume after an interrupt.

use super::JsonStore;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Lock-guarded scrape checkpoint file.
pub type CheckpointStore = JsonStore<Checkpoint>;

/// Progress of the scraping pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Checkpoint {
    /// Most recently completed URL.
    pub last_url: Option<String>,
    /// Every URL completed so far, in completion order, without duplicates.
    pub processed_urls: Vec<String>,
    /// Root URL of the run that wrote this checkpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

impl Checkpoint {
    /// Record a completed URL. Returns `true` if the processed set grew.
    pub fn record(&mut self, url: &str) -> bool {
        self.last_url = Some(url.to_string());
        if self.processed_urls.iter().any(|u| u == url) {
            false
        } else {
            self.processed_urls.push(url.to_string());
            true
        }
    }

    pub fn processed_set(&self) -> HashSet<&str> {
        self.processed_urls.iter().map(String::as_str).collect()
    }

    pub fn is_processed(&self, url: &str) -> bool {
        self.processed_urls.iter().any(|u| u == url)
    }

    /// Order the work for a run over `discovered`.
    ///
    /// The result is every discovered URL not yet processed. If `last_url` was
    /// discovered, it comes first regardless of whether it is processed, since
    /// an interrupt may have landed between writing its entry and recording it.
    pub fn plan(&self, discovered: &BTreeSet<String>) -> Vec<String> {
        let processed = self.processed_set();
        let boundary = self
            .last_url
            .as_deref()
            .filter(|u| discovered.contains(*u));

        let mut queue = Vec::with_capacity(discovered.len());
        if let Some(b) = boundary {
            queue.push(b.to_string());
        }
        queue.extend(
            discovered
                .iter()
                .filter(|u| Some(u.as_str()) != boundary && !processed.contains(u.as_str()))
                .cloned(),
        );
        queue
    }
}

/// Progress of the enrichment pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentCheckpoint {
    pub processed_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(urls: &[&str]) -> BTreeSet<String> {
        urls.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_record_dedups() {
        let mut cp = Checkpoint::default();
        assert!(cp.record("a"));
        assert!(cp.record("b"));
        assert!(!cp.record("a"));

        assert_eq!(cp.processed_urls, vec!["a", "b"]);
        assert_eq!(cp.last_url.as_deref(), Some("a"));
    }

    #[test]
    fn test_plan_is_difference() {
        let cp = Checkpoint {
            last_url: None,
            processed_urls: vec!["b".into(), "z".into()],
            source_url: None,
        };

        assert_eq!(cp.plan(&set(&["a", "b", "c"])), vec!["a", "c"]);
    }

    #[test]
    fn test_plan_puts_boundary_first() {
        let cp = Checkpoint {
            last_url: Some("c".into()),
            processed_urls: vec!["a".into(), "c".into()],
            source_url: None,
        };

        assert_eq!(cp.plan(&set(&["a", "b", "c", "d"])), vec!["c", "b", "d"]);
    }

    #[test]
    fn test_plan_ignores_undiscovered_boundary() {
        let cp = Checkpoint {
            last_url: Some("elsewhere".into()),
            processed_urls: vec!["elsewhere".into()],
            source_url: None,
        };

        assert_eq!(cp.plan(&set(&["a"])), vec!["a"]);
    }

    #[test]
    fn test_fully_processed_plans_only_boundary() {
        let mut cp = Checkpoint::default();
        for u in ["a", "b"] {
            cp.record(u);
        }

        assert_eq!(cp.plan(&set(&["a", "b"])), vec!["b"]);
    }

    #[test]
    fn test_checkpoint_json_shape() {
        let json = r#"{"last_url": "u", "processed_urls": ["u"]}"#;
        let cp: Checkpoint = serde_json::from_str(json).unwrap();
        assert_eq!(cp.last_url.as_deref(), Some("u"));
        assert_eq!(cp.source_url, None);

        let out = serde_json::to_value(&Checkpoint::default()).unwrap();
        assert!(out["last_url"].is_null());
        assert_eq!(out["processed_urls"], serde_json::json!([]));
        assert!(out.get("source_url").is_none());
    }
}
