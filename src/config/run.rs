//! Immutable per-run configuration.
//!
//! [`Settings`] is the mutable, file-backed layer. Once the CLI has applied its
//! overrides, it is folded into one of the structs here and shared read-only
//! with every pipeline component for the rest of the run.

use super::Settings;
use std::path::PathBuf;
use std::time::Duration;

/// Convert a seconds value from config into a duration. Non-positive,
/// non-finite or out-of-range values become zero.
pub fn seconds(value: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
    } else {
        Duration::ZERO
    }
}

/// Inclusive duration bounds. A bound of zero is disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DurationFilter {
    pub min_seconds: u64,
    pub max_seconds: u64,
}

impl DurationFilter {
    pub fn new(min_seconds: u64, max_seconds: u64) -> Self {
        Self {
            min_seconds,
            max_seconds,
        }
    }

    /// Why a duration is rejected, or `None` when it is admitted.
    pub fn rejection(&self, duration: f64) -> Option<&'static str> {
        if self.min_seconds > 0 && duration < self.min_seconds as f64 {
            return Some("duration too short");
        }
        if self.max_seconds > 0 && duration > self.max_seconds as f64 {
            return Some("duration too long");
        }
        None
    }

    pub fn admits(&self, duration: f64) -> bool {
        self.rejection(duration).is_none()
    }
}

/// Exponential backoff for transient failures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based): `base * 2^(attempt-1)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exp)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

/// Configuration for one scraping run.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub output_dir: PathBuf,
    pub catalog_path: PathBuf,
    pub checkpoint_path: PathBuf,
    pub audio_format: String,
    pub bitrate: String,
    pub retry: RetryPolicy,
    pub max_depth: u32,
    pub workers: usize,
    pub durations: DurationFilter,
    pub rate_limit: Duration,
    pub extract_transcript: bool,
    pub download_audio: bool,
    pub socket_timeout: Duration,
    pub lock_timeout: Duration,
    pub user_agent: String,
}

impl ScrapeConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        let s = &settings.scraper;
        Self {
            output_dir: settings.resolve(&s.output_dir),
            catalog_path: settings.resolve(&s.catalog_file),
            checkpoint_path: settings.resolve(&s.checkpoint_file),
            audio_format: s.audio_format.clone(),
            bitrate: s.bitrate.clone(),
            retry: RetryPolicy {
                max_retries: s.max_retries,
                base_delay: seconds(s.retry_base_seconds),
            },
            max_depth: s.recursive_depth,
            workers: s.max_workers,
            durations: DurationFilter::new(s.min_duration, s.max_duration),
            rate_limit: seconds(s.rate_limit),
            extract_transcript: s.extract_description,
            download_audio: s.download_audio,
            socket_timeout: Duration::from_secs(s.socket_timeout_seconds),
            lock_timeout: Duration::from_secs(s.lock_timeout_seconds),
            user_agent: s.user_agent.clone(),
        }
    }
}

/// Configuration for one enrichment run.
#[derive(Debug, Clone)]
pub struct EnrichConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub checkpoint_path: PathBuf,
    pub api_base: String,
    pub model: String,
    pub temperature: f32,
    pub batch_size: usize,
    pub rate_limit: Duration,
    pub timeout: Duration,
    pub lock_timeout: Duration,
    pub resume: bool,
}

impl EnrichConfig {
    pub fn from_settings(settings: &Settings, resume: bool) -> Self {
        let e = &settings.enrichment;
        Self {
            input_path: settings.resolve(&e.input_file),
            output_path: settings.resolve(&e.output_file),
            checkpoint_path: settings.resolve(&e.checkpoint_file),
            api_base: e.api_base.clone(),
            model: e.model.clone(),
            temperature: e.temperature,
            batch_size: e.batch_size.max(1),
            rate_limit: seconds(e.rate_limit),
            timeout: Duration::from_secs(e.timeout_seconds),
            lock_timeout: Duration::from_secs(e.lock_timeout_seconds),
            resume,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_filter_bounds() {
        let both = DurationFilter::new(60, 3600);
        assert!(!both.admits(59.9));
        assert!(both.admits(60.0));
        assert!(both.admits(3600.0));
        assert!(!both.admits(3600.5));

        let min_only = DurationFilter::new(60, 0);
        assert_eq!(min_only.rejection(30.0), Some("duration too short"));
        assert!(min_only.admits(1_000_000.0));

        let max_only = DurationFilter::new(0, 100);
        assert!(max_only.admits(0.0));
        assert_eq!(max_only.rejection(101.0), Some("duration too long"));

        assert!(DurationFilter::default().admits(0.0));
    }

    #[test]
    fn test_duration_filter_sweep() {
        for (min, max) in [(1u64, 10u64), (5, 5), (0, 7), (3, 0)] {
            let filter = DurationFilter::new(min, max);
            for d in 0..15u64 {
                let expected = (min == 0 || d >= min) && (max == 0 || d <= max);
                assert_eq!(filter.admits(d as f64), expected, "min={min} max={max} d={d}");
            }
        }
    }

    #[test]
    fn test_retry_delays_double() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(3), Duration::from_secs(8));
    }

    #[test]
    fn test_seconds_disables_nonpositive() {
        assert_eq!(seconds(0.0), Duration::ZERO);
        assert_eq!(seconds(-1.0), Duration::ZERO);
        assert_eq!(seconds(f64::NAN), Duration::ZERO);
        assert_eq!(seconds(1.5), Duration::from_millis(1500));
    }

    #[test]
    fn test_scrape_config_from_settings() {
        let mut settings = Settings::default();
        settings.general.data_dir = "/data".to_string();
        settings.scraper.min_duration = 60;
        settings.scraper.rate_limit = 0.0;

        let config = ScrapeConfig::from_settings(&settings);
        assert_eq!(config.catalog_path, PathBuf::from("/data/audiobooks.json"));
        assert_eq!(config.durations, DurationFilter::new(60, 0));
        assert_eq!(config.rate_limit, Duration::ZERO);
        assert_eq!(config.workers, 4);
    }
}
