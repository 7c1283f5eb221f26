//! Error types for audioshelf.

use std::path::PathBuf;
use thiserror::Error;

/// Substrings in tool output that mark a failure as network-related.
const TRANSIENT_MARKERS: &[&str] = &[
    "http error",
    "connection",
    "timeout",
    "timed out",
    "network",
    "socket",
    "ssl",
    "temporary failure",
    "read timeout",
    "reset by peer",
];

/// Library-level error type for audioshelf operations.
#[derive(Error, Debug)]
pub enum ShelfError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid YouTube URL: {0}")]
    InvalidUrl(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Metadata extraction failed: {0}")]
    Extraction(String),

    #[error("Video not found or unavailable: {0}")]
    VideoNotFound(String),

    #[error("Could not acquire lock on {} within timeout", .0.display())]
    LockTimeout(PathBuf),

    #[error("Refusing to overwrite unparsable store {}: {source}", path.display())]
    CorruptStore {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Audio download failed: {0}")]
    AudioDownload(String),

    #[error("Enrichment failed: {0}")]
    Enrichment(String),

    #[error("Chat API error: {0}")]
    ChatApi(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("External tool failed: {0}")]
    ToolFailed(String),

    #[error("Operation cancelled")]
    Cancelled,
}

/// How a failure should be treated by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Malformed input. Reported, never retried.
    InvalidInput,
    /// Network-class failure. Retried with backoff.
    Transient,
    /// Any other failure. Reported immediately.
    Permanent,
    /// A store lock could not be taken in time. Skipped with a warning.
    ResourceContention,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::InvalidInput => write!(f, "invalid input"),
            FailureKind::Transient => write!(f, "transient"),
            FailureKind::Permanent => write!(f, "permanent"),
            FailureKind::ResourceContention => write!(f, "resource contention"),
        }
    }
}

impl ShelfError {
    /// Classify this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            ShelfError::InvalidUrl(_) | ShelfError::Config(_) => FailureKind::InvalidInput,
            ShelfError::Network(_) => FailureKind::Transient,
            ShelfError::Http(e) if e.is_timeout() || e.is_connect() || e.is_request() => {
                FailureKind::Transient
            }
            ShelfError::Io(e) if is_transient_io(e) => FailureKind::Transient,
            ShelfError::LockTimeout(_) => FailureKind::ResourceContention,
            _ => FailureKind::Permanent,
        }
    }

    /// Whether the operation that produced this error is worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.kind() == FailureKind::Transient
    }

    /// Build an error from a failed tool invocation, classifying it by its stderr.
    pub fn from_tool_output(context: &str, stderr: &str) -> Self {
        let message = format!("{}: {}", context, stderr.trim());
        if looks_transient(stderr) {
            ShelfError::Network(message)
        } else {
            ShelfError::Extraction(message)
        }
    }
}

/// Check whether a message describes a network-class failure.
pub fn looks_transient(message: &str) -> bool {
    let lower = message.to_lowercase();
    TRANSIENT_MARKERS.iter().any(|m| lower.contains(m))
}

fn is_transient_io(e: &std::io::Error) -> bool {
    use std::io::ErrorKind;
    matches!(
        e.kind(),
        ErrorKind::TimedOut
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::ConnectionRefused
            | ErrorKind::Interrupted
    )
}

/// Result type alias for audioshelf operations.
pub type Result<T> = std::result::Result<T, ShelfError>;
