//! LLM Provider implementations
//!
//! ## Architecture
//!
//! All real providers go through the `genai` crate, which handles:
//! - Streaming SSE parsing
//! - Provider-specific protocols (OpenAI, Anthropic, Gemini, etc.)
//! - Tool calling
//!
//! Providers not natively in genai (OpenRouter, Mistral, any custom base URL)
//! are handled via genai's `ServiceTargetResolver` using the OpenAI protocol.
//!
//! The `MockProvider` plays scripted turns for tests and offline use.

mod traits;
mod error;
mod genai_adapter;
mod genai_provider;
mod mock;

// Core traits and types
pub use traits::{ChatOptions, Provider, ProviderModelConfig, StreamResponse};
pub use error::{ProviderError, ProviderResult};

pub use genai_provider::GenaiProvider;
pub use genai_adapter::{adapter_kind_for, is_genai_native, is_genai_supported, ProviderConfig};

pub use mock::{MockProvider, MockTurn, RecordedRequest};

use crate::config::EngineSettings;
use crate::logging::Logger;
use std::sync::Arc;

/// Create the provider named by `settings.provider`
///
/// `mock` selects the echoing [`MockProvider`]; everything else goes through
/// [`GenaiProvider`], unknown ids as OpenAI-compatible endpoints.
pub fn create_provider(settings: &EngineSettings, logger: Arc<dyn Logger>) -> Arc<dyn Provider> {
    let provider_id = settings.provider.to_lowercase();
    match provider_id.as_str() {
        "mock" => Arc::new(MockProvider::echo(logger)),
        _ => {
            if !GenaiProvider::supports(&provider_id) {
                logger.debug(&format!(
                    "[Providers] {} is not native to genai, using the OpenAI protocol",
                    provider_id
                ));
            }
            Arc::new(GenaiProvider::new(provider_id, logger))
        }
    }
}

/// List all supported provider IDs
pub fn supported_providers() -> Vec<&'static str> {
    vec![
        // Native genai providers
        "openai",
        "anthropic",
        "gemini",
        "ollama",
        "groq",
        "xai",
        "deepseek",
        "cohere",
        "fireworks",
        "together",
        // OpenAI-compatible providers via resolver
        "openrouter",
        "mistral",
        // Testing
        "mock",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;

    #[test]
    fn test_create_provider() {
        let logger: Arc<dyn Logger> = Arc::new(NoOpLogger::new());
        let settings = EngineSettings {
            provider: "Mock".into(),
            ..Default::default()
        };
        assert_eq!(create_provider(&settings, logger.clone()).name(), "mock");

        let settings = EngineSettings::default();
        assert_eq!(create_provider(&settings, logger.clone()).name(), "openai");

        let settings = EngineSettings {
            provider: "my-vllm".into(),
            base_url: Some("http://localhost:8000/v1/".into()),
            ..Default::default()
        };
        assert_eq!(create_provider(&settings, logger).name(), "my-vllm");
    }

    #[test]
    fn test_supported_providers_are_routable() {
        for id in supported_providers() {
            assert!(id == "mock" || GenaiProvider::supports(id), "{}", id);
        }
    }
}
