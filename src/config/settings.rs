//! Configuration settings for audioshelf.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub scraper: ScraperSettings,
    pub enrichment: EnrichmentSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory that relative catalog/checkpoint paths are resolved against.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: ".".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Scraper (ingestion pipeline) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperSettings {
    /// Directory for downloaded audio.
    pub output_dir: String,
    /// Catalog JSON file.
    pub catalog_file: String,
    /// Checkpoint JSON file.
    pub checkpoint_file: String,
    /// Target audio container/codec for downloads.
    pub audio_format: String,
    /// Target audio bitrate for downloads.
    pub bitrate: String,
    /// Maximum retries for network-class failures.
    pub max_retries: u32,
    /// Base delay for exponential backoff, in seconds.
    pub retry_base_seconds: f64,
    /// How deep to go when traversing channels/playlists.
    pub recursive_depth: u32,
    /// Number of parallel extraction workers.
    pub max_workers: usize,
    /// Minimum duration in seconds (0 = no filter).
    pub min_duration: u64,
    /// Maximum duration in seconds (0 = no filter).
    pub max_duration: u64,
    /// Minimum seconds between outbound requests.
    pub rate_limit: f64,
    /// Extract a transcript from the video description.
    pub extract_description: bool,
    /// Download audio in addition to metadata.
    pub download_audio: bool,
    /// Socket timeout passed to yt-dlp, in seconds.
    pub socket_timeout_seconds: u64,
    /// Timeout for acquiring a store lock, in seconds.
    pub lock_timeout_seconds: u64,
    /// User agent for outbound requests.
    pub user_agent: String,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self {
            output_dir: "audiobooks".to_string(),
            catalog_file: "audiobooks.json".to_string(),
            checkpoint_file: "checkpoint.json".to_string(),
            audio_format: "mp3".to_string(),
            bitrate: "64k".to_string(),
            max_retries: 3,
            retry_base_seconds: 2.0,
            recursive_depth: 2,
            max_workers: 4,
            min_duration: 0,
            max_duration: 0,
            rate_limit: 1.0,
            extract_description: true,
            download_audio: false,
            socket_timeout_seconds: 30,
            lock_timeout_seconds: 30,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36"
                .to_string(),
        }
    }
}

/// LLM enrichment settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentSettings {
    /// Catalog to read.
    pub input_file: String,
    /// Augmented catalog to write.
    pub output_file: String,
    /// Enrichment checkpoint file.
    pub checkpoint_file: String,
    /// Base URL of the OpenAI-compatible endpoint.
    pub api_base: String,
    /// Model name sent with each request.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Items processed between checkpoint saves.
    pub batch_size: usize,
    /// Minimum seconds between API calls.
    pub rate_limit: f64,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
    /// Timeout for acquiring a store lock, in seconds.
    pub lock_timeout_seconds: u64,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            input_file: "audiobooks.json".to_string(),
            output_file: "augmented.json".to_string(),
            checkpoint_file: "augment_checkpoint.json".to_string(),
            api_base: "http://localhost:1234/v1".to_string(),
            model: "qwen2.5-coder-3b-instruct-mlx".to_string(),
            temperature: 0.2,
            batch_size: 10,
            rate_limit: 1.0,
            timeout_seconds: 300,
            lock_timeout_seconds: 10,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("audioshelf")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Resolve a possibly relative file setting against the data directory.
    pub fn resolve(&self, path: &str) -> PathBuf {
        let expanded = Self::expand_path(path);
        if expanded.is_absolute() {
            expanded
        } else {
            self.data_dir().join(expanded)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_scraper_conventions() {
        let settings = Settings::default();
        assert_eq!(settings.scraper.catalog_file, "audiobooks.json");
        assert_eq!(settings.scraper.checkpoint_file, "checkpoint.json");
        assert_eq!(settings.scraper.recursive_depth, 2);
        assert_eq!(settings.scraper.max_workers, 4);
        assert_eq!(settings.scraper.max_retries, 3);
        assert_eq!(settings.enrichment.output_file, "augmented.json");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [scraper]
            max_workers = 8
            rate_limit = 0.5
            "#,
        )
        .unwrap();

        assert_eq!(settings.scraper.max_workers, 8);
        assert_eq!(settings.scraper.rate_limit, 0.5);
        assert_eq!(settings.scraper.recursive_depth, 2);
        assert_eq!(settings.enrichment.batch_size, 10);
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let mut settings = Settings::default();
        settings.general.data_dir = "/srv/shelf".to_string();

        assert_eq!(
            settings.resolve("audiobooks.json"),
            PathBuf::from("/srv/shelf/audiobooks.json")
        );
        assert_eq!(
            settings.resolve("/tmp/other.json"),
            PathBuf::from("/tmp/other.json")
        );
    }
}
