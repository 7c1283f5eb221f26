//! Transcript-like text pulled out of a video description.

use regex::Regex;
use std::sync::LazyLock;

/// Lines longer than this count as prose when no timestamps are present.
const PARAGRAPH_MIN_CHARS: usize = 100;

static TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2}:)?\d{1,2}:\d{2}|\d{1,2}:\d{2}|\d{1,2}\.\d{2}").expect("valid regex")
});

/// Extract chapter listings or long paragraphs from a description.
///
/// Lines containing a timestamp (`H:MM:SS`, `MM:SS` or `MM.SS`) are kept
/// verbatim, one per line. If there are none, lines longer than
/// [`PARAGRAPH_MIN_CHARS`] are kept instead, separated by blank lines.
pub fn from_description(description: &str) -> String {
    if description.is_empty() {
        return String::new();
    }

    let lines: Vec<&str> = description.split('\n').collect();

    let mut transcript = String::new();
    for line in lines.iter().filter(|l| TIMESTAMP.is_match(l)) {
        transcript.push_str(line);
        transcript.push('\n');
    }

    if transcript.is_empty() {
        for line in lines
            .iter()
            .filter(|l| l.trim().chars().count() > PARAGRAPH_MIN_CHARS)
        {
            transcript.push_str(line);
            transcript.push_str("\n\n");
        }
    }

    transcript
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_timestamp_lines() {
        let description = "Full audiobook\n0:00 Chapter 1\n1:02:33 Chapter 2\nSubscribe!\n12.30 Epilogue";
        assert_eq!(
            from_description(description),
            "0:00 Chapter 1\n1:02:33 Chapter 2\n12.30 Epilogue\n"
        );
    }

    #[test]
    fn test_falls_back_to_long_paragraphs() {
        let long = "a".repeat(120);
        let description = format!("short line\n{}\n  {}  \nanother", long, "b".repeat(101));

        assert_eq!(
            from_description(&description),
            format!("{}\n\n  {}  \n\n", long, "b".repeat(101))
        );
    }

    #[test]
    fn test_paragraph_threshold_is_exclusive() {
        let exactly = "c".repeat(100);
        assert_eq!(from_description(&exactly), "");
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        // 60 two-byte characters: 120 bytes but only 60 chars.
        let accented = "é".repeat(60);
        assert_eq!(from_description(&accented), "");
    }

    #[test]
    fn test_empty_description() {
        assert_eq!(from_description(""), "");
    }
}
