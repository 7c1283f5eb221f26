//! Prompt construction and reply parsing.

use crate::config::Prompts;
use crate::store::{CatalogEntry, Enrichment};
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Tags beyond this many are left out of the prompt.
const MAX_PROMPT_TAGS: usize = 10;

const PARSE_FAILURE_SYNOPSIS: &str = "Failed to generate synopsis";

static JSON_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\{[\s\S]*\})").expect("valid regex"));

/// Fill a user prompt template from a catalog entry.
pub fn build_prompt(template: &str, entry: &CatalogEntry) -> String {
    let tags: Vec<&str> = entry
        .tags
        .iter()
        .take(MAX_PROMPT_TAGS)
        .map(String::as_str)
        .collect();

    let mut vars = HashMap::new();
    vars.insert("title".to_string(), entry.title.clone());
    vars.insert("channel".to_string(), entry.channel.clone());
    vars.insert("description".to_string(), entry.description.clone());
    vars.insert("tags".to_string(), tags.join(", "));
    vars.insert("duration".to_string(), entry.duration.to_string());

    Prompts::render(template, &vars)
}

/// Interpret a model reply.
///
/// The outermost `{...}` span is parsed as JSON; missing keys become empty
/// strings. A reply without a parsable object yields a placeholder synopsis
/// and keeps the raw text.
pub fn parse_reply(content: &str) -> Enrichment {
    let candidate = JSON_OBJECT
        .captures(content)
        .and_then(|c| c.get(1))
        .map_or(content, |m| m.as_str());

    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => {
            let field = |key: &str| {
                map.get(key)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .trim()
                    .to_string()
            };
            Enrichment {
                real_title: field("real_title"),
                real_author: field("real_author"),
                real_synopsis: field("real_synopsis"),
                genre: field("genre"),
                raw_response: None,
            }
        }
        _ => Enrichment {
            real_synopsis: PARSE_FAILURE_SYNOPSIS.to_string(),
            raw_response: Some(content.to_string()),
            ..Default::default()
        },
    }
}

/// Placeholder recorded when the request itself failed.
pub fn failed_request(error: &str) -> Enrichment {
    Enrichment {
        real_synopsis: format!("Error: {}", error),
        ..Default::default()
    }
}
