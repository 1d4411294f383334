//! Provider trait definition

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::pin::Pin;

use crate::config::EngineSettings;
use crate::engine::ToolCallAssembler;
use crate::types::{CancellationToken, Completion, Message, StreamChunk, ToolSchema};
use super::error::{ProviderError, ProviderResult};

/// Model configuration for provider requests
#[derive(Debug, Clone)]
pub struct ProviderModelConfig {
    /// Model identifier as used by the provider's API
    pub model: String,
    /// API key for authentication
    pub api_key: Option<String>,
    /// Custom API base URL
    pub api_base: Option<String>,
}

impl ProviderModelConfig {
    /// Create a new model config
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            api_key: None,
            api_base: None,
        }
    }

    /// Set the API key
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the API base URL
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = Some(base.into());
        self
    }
}

impl From<&EngineSettings> for ProviderModelConfig {
    fn from(settings: &EngineSettings) -> Self {
        Self {
            model: settings.model.clone(),
            api_key: settings.api_key.clone(),
            api_base: settings.base_url.clone(),
        }
    }
}

/// Per-request options
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    /// Temperature for response generation (0.0 - 2.0)
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Tools offered to the model; `None` withholds tools entirely
    pub tools: Option<Vec<ToolSchema>>,
}

impl ChatOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    /// Offer tools; an empty list is sent as no tools at all
    pub fn with_tools(mut self, tools: Vec<ToolSchema>) -> Self {
        self.tools = if tools.is_empty() { None } else { Some(tools) };
        self
    }
}

/// Type alias for the streaming response
pub type StreamResponse = Pin<Box<dyn Stream<Item = ProviderResult<StreamChunk>> + Send>>;

/// Provider trait for LLM implementations
///
/// Implementors only need to stream; a buffered completion is the stream
/// drained through a [`ToolCallAssembler`].
#[async_trait]
pub trait Provider: Send + Sync {
    /// Get the provider name (e.g., "openai", "anthropic")
    fn name(&self) -> &str;

    /// Stream a chat completion
    async fn stream_chat(
        &self,
        messages: Vec<Message>,
        model: ProviderModelConfig,
        options: ChatOptions,
        cancel_token: CancellationToken,
    ) -> ProviderResult<StreamResponse>;

    /// Request a complete response
    async fn complete(
        &self,
        messages: Vec<Message>,
        model: ProviderModelConfig,
        options: ChatOptions,
        cancel_token: CancellationToken,
    ) -> ProviderResult<Completion> {
        let mut stream = self
            .stream_chat(messages, model, options, cancel_token.clone())
            .await?;
        let mut assembler = ToolCallAssembler::new();
        while let Some(chunk) = stream.next().await {
            if cancel_token.is_cancelled() {
                return Err(ProviderError::Cancelled);
            }
            assembler.push(chunk?);
        }
        Ok(assembler.finish())
    }
}
