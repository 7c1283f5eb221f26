//! Chat-completion backends for enrichment.

use crate::error::{Result, ShelfError};
use crate::openai::create_client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Something that turns a system and user prompt into a reply.
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

/// [`Completer`] backed by an OpenAI-compatible chat endpoint.
pub struct ChatClient {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl ChatClient {
    pub fn new(api_base: &str, model: &str, temperature: f32, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: create_client(api_base, timeout)?,
            model: model.to_string(),
            temperature,
        })
    }
}

#[async_trait]
impl Completer for ChatClient {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system)
                .build()
                .map_err(|e| ShelfError::ChatApi(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user)
                .build()
                .map_err(|e| ShelfError::ChatApi(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .build()
            .map_err(|e| ShelfError::ChatApi(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| ShelfError::ChatApi(e.to_string()))?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| ShelfError::ChatApi("Empty response from model".to_string()))?
            .clone();

        debug!("Received {} characters", content.len());
        Ok(content)
    }
}
