//! Prompt templates for catalog enrichment.
//!
//! Prompts can be customized by placing an `enrichment.toml` file in the custom
//! prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub enrichment: EnrichmentPrompts,
}

/// Prompts for inferring book details from a video record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentPrompts {
    pub system: String,
    pub user: String,
}

impl Default for EnrichmentPrompts {
    fn default() -> Self {
        Self {
            system: "You are a helpful assistant that specializes in books and literature."
                .to_string(),

            user: r#"You are a literary expert. Please analyze this audiobook information and provide:
1. The real book title (without narrator info, just the book title)
2. The real author's name (just the author's name, standardized)
3. A brief synopsis of the work (2-3 sentences maximum)
4. The primary genre of the work (one or two words)

Information:
- Title: {{title}}
- Channel: {{channel}}
- Description: {{description}}
- Tags: {{tags}}
- Duration: {{duration}} seconds

Format your response as a JSON object with these fields:
{"real_title": "Actual Book Title", "real_author": "Author Name", "real_synopsis": "Brief synopsis of the work.", "genre": "Genre"}
Do not include any other text in your response."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts, overriding defaults from `custom_dir` when present.
    pub fn load(custom_dir: Option<&str>) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let enrichment_path = custom_path.join("enrichment.toml");
            if enrichment_path.exists() {
                let content = std::fs::read_to_string(&enrichment_path)?;
                prompts.enrichment = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }
}
