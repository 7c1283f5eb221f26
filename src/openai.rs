//! Client setup for OpenAI-compatible chat endpoints.

use crate::error::Result;
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Placeholder key; local servers ignore it but the client sends a header.
const LOCAL_API_KEY: &str = "not-needed";

/// Create a chat client for the endpoint at `api_base` with a request timeout.
///
/// `OPENAI_API_KEY` is used when set, so hosted endpoints work as well.
pub fn create_client(api_base: &str, timeout: Duration) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder().timeout(timeout).build()?;

    let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_else(|_| LOCAL_API_KEY.to_string());
    let config = OpenAIConfig::new()
        .with_api_base(api_base.trim_end_matches('/'))
        .with_api_key(api_key);

    Ok(Client::with_config(config).with_http_client(http_client))
}
