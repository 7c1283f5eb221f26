//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools are available before starting a run that
//! would otherwise fail on every item.

use crate::error::{Result, ShelfError};
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Metadata scraping needs yt-dlp.
    Scrape,
    /// Audio downloads additionally need ffmpeg and ffprobe.
    ScrapeWithAudio,
    /// Enrichment talks HTTP only.
    Augment,
}

/// Run pre-flight checks for the given operation.
pub fn check(operation: Operation) -> Result<()> {
    match operation {
        Operation::Scrape => {
            check_tool("yt-dlp")?;
        }
        Operation::ScrapeWithAudio => {
            check_tool("yt-dlp")?;
            check_tool("ffmpeg")?;
            check_tool("ffprobe")?;
        }
        Operation::Augment => {}
    }
    Ok(())
}

/// Check if an external tool is available.
fn check_tool(name: &str) -> Result<()> {
    // ffmpeg/ffprobe use -version (single dash), others use --version
    let version_arg = match name {
        "ffmpeg" | "ffprobe" => "-version",
        _ => "--version",
    };
    match Command::new(name).arg(version_arg).output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(ShelfError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ShelfError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(ShelfError::ToolNotFound(format!("{}: {}", name, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_augment_no_requirements() {
        assert!(check(Operation::Augment).is_ok());
    }

    #[test]
    fn test_missing_tool() {
        let err = check_tool("audioshelf-no-such-tool").unwrap_err();
        assert!(matches!(err, ShelfError::ToolNotFound(_)));
    }
}
