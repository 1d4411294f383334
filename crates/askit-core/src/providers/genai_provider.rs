//! GenaiProvider - Unified provider using the genai crate
//!
//! Handles every genai-supported provider (OpenAI, Anthropic, Gemini, Ollama,
//! ...) plus OpenAI-compatible endpoints (OpenRouter, Mistral, any custom
//! base URL) via the ServiceTargetResolver.

use async_trait::async_trait;
use futures::{stream, StreamExt};
use std::sync::Arc;

use genai::chat::{ChatRequest, ChatStreamEvent};

use crate::logging::Logger;
use crate::types::{CancellationToken, Message};

use super::error::{ProviderError, ProviderResult};
use super::genai_adapter::{
    create_client, discarded_assistant_text, from_genai_event, is_genai_supported,
    to_genai_messages, to_genai_options, to_genai_tools, ProviderConfig,
};
use super::traits::{ChatOptions, Provider, ProviderModelConfig, StreamResponse};

/// Unified provider using genai for all supported LLM APIs
pub struct GenaiProvider {
    /// Provider identifier
    provider_id: String,
    /// Logger for debug output
    logger: Arc<dyn Logger>,
}

impl GenaiProvider {
    /// Create a new GenaiProvider
    pub fn new(provider_id: impl Into<String>, logger: Arc<dyn Logger>) -> Self {
        Self {
            provider_id: provider_id.into().to_lowercase(),
            logger,
        }
    }

    /// Check if this provider can handle the given provider ID
    pub fn supports(provider_id: &str) -> bool {
        is_genai_supported(provider_id)
    }

    /// Extract model name from a model string (e.g., "openai/gpt-4" -> "gpt-4")
    ///
    /// OpenRouter model ids are themselves `vendor/model` and are kept whole.
    pub fn extract_model_name<'a>(&self, model: &'a str) -> &'a str {
        if self.provider_id == "openrouter" {
            return model;
        }
        match model.split_once('/') {
            Some((prefix, rest)) if prefix.eq_ignore_ascii_case(&self.provider_id) => rest,
            _ => model,
        }
    }
}

#[async_trait]
impl Provider for GenaiProvider {
    fn name(&self) -> &str {
        &self.provider_id
    }

    async fn stream_chat(
        &self,
        messages: Vec<Message>,
        model_config: ProviderModelConfig,
        options: ChatOptions,
        cancel_token: CancellationToken,
    ) -> ProviderResult<StreamResponse> {
        let model_name = self.extract_model_name(&model_config.model).to_string();
        self.logger.info(&format!(
            "[GenaiProvider] stream_chat: provider={}, model={}, messages={}, tools={}",
            self.provider_id,
            model_name,
            messages.len(),
            options.tools.as_ref().map_or(0, Vec::len)
        ));

        let config = ProviderConfig {
            provider: self.provider_id.clone(),
            api_key: model_config.api_key.clone(),
            api_base: model_config.api_base.clone(),
        };
        let client = create_client(&config);

        let discarded = discarded_assistant_text(&messages);
        if discarded > 0 {
            self.logger.debug(&format!(
                "[GenaiProvider] Dropping text of {} assistant tool-call message(s)",
                discarded
            ));
        }

        let mut chat_req = ChatRequest::new(to_genai_messages(messages)?);
        if let Some(tools) = options.tools.clone() {
            chat_req = chat_req.with_tools(to_genai_tools(tools));
        }
        let genai_options = to_genai_options(&options);

        let start = client.exec_chat_stream(&model_name, chat_req, Some(&genai_options));
        let chat_stream = match cancel_token.run_until_cancelled(start).await {
            None => return Err(ProviderError::Cancelled),
            Some(result) => {
                result.map_err(|e| ProviderError::request(&self.provider_id, e.to_string()))?
            }
        };

        self.logger.debug("[GenaiProvider] Stream started successfully");

        let cancel = cancel_token.clone();
        let logger = Arc::clone(&self.logger);
        let provider_id = self.provider_id.clone();

        let stream = chat_stream
            .stream
            .take_while(move |_| {
                let live = !cancel.is_cancelled();
                async move { live }
            })
            .map(move |result| match result {
                Ok(event) => {
                    match &event {
                        ChatStreamEvent::Chunk(c) => logger.debug(&format!(
                            "[GenaiProvider] Stream event: Chunk ({} chars)",
                            c.content.len()
                        )),
                        ChatStreamEvent::End(_) => logger.debug("[GenaiProvider] Stream event: End"),
                        _ => {}
                    }
                    from_genai_event(event).into_iter().map(Ok).collect::<Vec<_>>()
                }
                Err(e) => {
                    logger.error(&format!("[GenaiProvider] Stream error: {}", e));
                    vec![Err(ProviderError::stream(&provider_id, e.to_string()))]
                }
            })
            .flat_map(stream::iter);

        // A cancelled stream ends with an explicit error rather than silently
        let cancel = cancel_token;
        let tail = stream::once(async move { cancel.is_cancelled() })
            .filter_map(|cancelled| async move {
                cancelled.then_some(Err(ProviderError::Cancelled))
            });

        Ok(Box::pin(stream.chain(tail)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;

    #[test]
    fn test_extract_model_name() {
        let provider = GenaiProvider::new("openai", Arc::new(NoOpLogger::new()));
        assert_eq!(provider.extract_model_name("openai/gpt-4o-mini"), "gpt-4o-mini");
        assert_eq!(provider.extract_model_name("gpt-4o-mini"), "gpt-4o-mini");
        assert_eq!(provider.extract_model_name("anthropic/claude"), "anthropic/claude");

        let router = GenaiProvider::new("OpenRouter", Arc::new(NoOpLogger::new()));
        assert_eq!(router.name(), "openrouter");
        assert_eq!(router.extract_model_name("openai/gpt-4o-mini"), "openai/gpt-4o-mini");
    }

    #[test]
    fn test_supports() {
        assert!(GenaiProvider::supports("openai"));
        assert!(GenaiProvider::supports("anthropic"));
        assert!(GenaiProvider::supports("openrouter"));
        assert!(!GenaiProvider::supports("unknown_provider"));
    }
}
