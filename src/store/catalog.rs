//! Catalog entries.

use super::JsonStore;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// The catalog: video id → entry.
pub type Catalog = BTreeMap<String, CatalogEntry>;

/// Lock-guarded catalog file.
pub type CatalogStore = JsonStore<Catalog>;

/// One video's record in the catalog.
///
/// Fields written by other tools (cleanup passes, manual edits) are kept in
/// `extra` and written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogEntry {
    pub title: String,
    pub channel: String,
    pub channel_url: String,
    /// Duration in seconds.
    pub duration: f64,
    pub upload_date: String,
    pub description: String,
    pub transcript: String,
    pub view_count: Option<u64>,
    pub like_count: Option<u64>,
    pub download_date: String,
    pub url: String,
    pub audio_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_metadata: Option<AudioMetadata>,
    pub processed: bool,
    pub summary: String,
    pub thumbnail: String,
    pub tags: Vec<String>,
    pub categories: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub real_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub real_author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub real_synopsis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CatalogEntry {
    /// Whether an enrichment pass has filled in title, author and synopsis.
    pub fn is_augmented(&self) -> bool {
        [&self.real_title, &self.real_author, &self.real_synopsis]
            .iter()
            .all(|f| f.as_deref().is_some_and(|s| !s.trim().is_empty()))
    }

    /// Merge enrichment results into this entry.
    pub fn apply_enrichment(&mut self, enrichment: Enrichment) {
        self.real_title = Some(enrichment.real_title);
        self.real_author = Some(enrichment.real_author);
        self.real_synopsis = Some(enrichment.real_synopsis);
        if !enrichment.genre.is_empty() {
            self.genre = Some(enrichment.genre);
        }
        self.raw_response = enrichment.raw_response;
    }
}

/// Stream properties of a downloaded audio file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioMetadata {
    pub codec: String,
    pub channels: u32,
    pub sample_rate: String,
    pub bit_rate: String,
    pub duration: String,
}

/// Fields inferred by the enrichment pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Enrichment {
    pub real_title: String,
    pub real_author: String,
    pub real_synopsis: String,
    pub genre: String,
    #[serde(skip)]
    pub raw_response: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_fields_survive_roundtrip() {
        let json = r#"{
            "title": "Dracula (Full Audiobook)",
            "channel": "Readings",
            "duration": 3600.0,
            "view_count": null,
            "processed": true,
            "genre_confidence": 0.8,
            "cleanup_notes": ["fixed author"]
        }"#;

        let entry: CatalogEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.title, "Dracula (Full Audiobook)");
        assert_eq!(entry.view_count, None);
        assert!(entry.processed);
        assert_eq!(entry.extra.len(), 2);

        let out = serde_json::to_value(&entry).unwrap();
        assert_eq!(out["genre_confidence"], 0.8);
        assert_eq!(out["cleanup_notes"][0], "fixed author");
        assert!(out.get("real_title").is_none());
        assert!(out.get("audio_metadata").is_none());
    }

    #[test]
    fn test_apply_enrichment() {
        let mut entry = CatalogEntry::default();
        assert!(!entry.is_augmented());

        entry.apply_enrichment(Enrichment {
            real_title: "Dracula".into(),
            real_author: "Bram Stoker".into(),
            real_synopsis: "A count moves to London.".into(),
            genre: "Horror".into(),
            raw_response: None,
        });

        assert!(entry.is_augmented());
        assert_eq!(entry.genre.as_deref(), Some("Horror"));
    }

    #[test]
    fn test_blank_enrichment_is_not_augmented() {
        let mut entry = CatalogEntry::default();
        entry.apply_enrichment(Enrichment {
            real_synopsis: "Failed to generate synopsis".into(),
            raw_response: Some("garbage".into()),
            ..Default::default()
        });

        assert!(!entry.is_augmented());
        assert_eq!(entry.genre, None);
        assert_eq!(entry.raw_response.as_deref(), Some("garbage"));
    }
}
