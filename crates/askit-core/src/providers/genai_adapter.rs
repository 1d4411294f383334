//! Adapter between askit transcript types and genai types
//!
//! Tool calls cross the boundary in both directions: assistant messages carry
//! them back to the provider, and the stream's captured calls come out as
//! [`StreamChunk::ToolCallDelta`] fragments for the assembler.

use std::future::Future;
use std::pin::Pin;

use genai::chat::{
    ChatMessage as GenaiMessage, ChatOptions as GenaiOptions, ChatStreamEvent, Tool as GenaiTool,
    ToolCall as GenaiToolCall, ToolResponse as GenaiToolResponse,
};
use genai::resolver::{AuthData, AuthResolver, Endpoint, ServiceTargetResolver};
use genai::{adapter::AdapterKind, Client, ModelIden, ServiceTarget};
use serde_json::{json, Value};

use crate::types::{Message, Role, StreamChunk, ToolCallRequest, ToolSchema};

use super::error::{ProviderError, ProviderResult};
use super::traits::ChatOptions;

// ============================================================================
// Message Conversion: askit -> genai
// ============================================================================

/// Convert one transcript message
pub fn to_genai_message(msg: Message) -> ProviderResult<GenaiMessage> {
    Ok(match msg.role {
        Role::System => GenaiMessage::system(msg.content),
        Role::User => GenaiMessage::user(msg.content),
        Role::Assistant => match msg.tool_calls {
            // genai carries an assistant tool-call turn without its text
            Some(calls) if !calls.is_empty() => {
                let calls = calls
                    .iter()
                    .map(to_genai_tool_call)
                    .collect::<ProviderResult<Vec<_>>>()?;
                GenaiMessage::from(calls)
            }
            _ => GenaiMessage::assistant(msg.content),
        },
        Role::Tool => {
            let call_id = msg.tool_call_id.ok_or_else(|| {
                ProviderError::invalid_request("genai", "tool message without tool_call_id")
            })?;
            GenaiMessage::from(GenaiToolResponse::new(call_id, msg.content))
        }
    })
}

/// Assistant tool-call turns whose text genai cannot carry
pub fn discarded_assistant_text(messages: &[Message]) -> usize {
    messages
        .iter()
        .filter(|m| m.role == Role::Assistant && m.has_tool_calls() && !m.content.trim().is_empty())
        .count()
}

/// Convert a transcript
pub fn to_genai_messages(messages: Vec<Message>) -> ProviderResult<Vec<GenaiMessage>> {
    messages.into_iter().map(to_genai_message).collect()
}

/// Convert a requested call; argument text that is not JSON is passed as a string
pub fn to_genai_tool_call(call: &ToolCallRequest) -> ProviderResult<GenaiToolCall> {
    let arguments = call
        .parse_arguments()
        .unwrap_or_else(|_| Value::String(call.raw_arguments().to_string()));
    serde_json::from_value(json!({
        "call_id": call.id,
        "fn_name": call.name(),
        "fn_arguments": arguments,
    }))
    .map_err(ProviderError::from)
}

// ============================================================================
// Tool Conversion: askit -> genai
// ============================================================================

pub fn to_genai_tool(schema: ToolSchema) -> GenaiTool {
    GenaiTool::new(schema.name)
        .with_description(schema.description)
        .with_schema(schema.parameters)
}

pub fn to_genai_tools(tools: Vec<ToolSchema>) -> Vec<GenaiTool> {
    tools.into_iter().map(to_genai_tool).collect()
}

// ============================================================================
// Options Conversion: askit -> genai
// ============================================================================

pub fn to_genai_options(options: &ChatOptions) -> GenaiOptions {
    let mut genai_opts = GenaiOptions::default();

    if let Some(temp) = options.temperature {
        genai_opts = genai_opts.with_temperature(temp as f64);
    }

    if let Some(max_tokens) = options.max_tokens {
        genai_opts = genai_opts.with_max_tokens(max_tokens);
    }

    // Tool calls are only reported whole at the end of the stream
    genai_opts.with_capture_tool_calls(true)
}

// ============================================================================
// Response Conversion: genai -> askit
// ============================================================================

/// Argument text for a captured call
fn argument_text(arguments: &Value) -> String {
    match arguments {
        Value::String(raw) => raw.clone(),
        Value::Null => "{}".to_string(),
        other => other.to_string(),
    }
}

/// Fragments for one captured tool call
pub fn from_genai_tool_call(index: usize, tc: &GenaiToolCall) -> StreamChunk {
    StreamChunk::tool_call_delta(
        index,
        Some(tc.call_id.clone()),
        Some(tc.fn_name.clone()),
        Some(argument_text(&tc.fn_arguments)),
    )
}

/// Convert a genai stream event into zero or more chunks
pub fn from_genai_event(event: ChatStreamEvent) -> Vec<StreamChunk> {
    match event {
        ChatStreamEvent::Chunk(chunk) => vec![StreamChunk::text(chunk.content)],
        ChatStreamEvent::End(end) => {
            let mut chunks: Vec<StreamChunk> = end
                .captured_tool_calls()
                .map(|calls| {
                    calls
                        .iter()
                        .enumerate()
                        .map(|(i, tc)| from_genai_tool_call(i, tc))
                        .collect()
                })
                .unwrap_or_default();
            let reason = if chunks.is_empty() { "stop" } else { "tool_calls" };
            chunks.push(StreamChunk::finish(reason));
            chunks
        }
        // Partial tool calls are superseded by the captured set at End
        ChatStreamEvent::ToolCallChunk(_) => Vec::new(),
        _ => Vec::new(),
    }
}

// ============================================================================
// Provider Resolution
// ============================================================================

/// Provider configuration for routing
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Provider identifier (e.g., "openai", "openrouter")
    pub provider: String,
    /// API key for authentication
    pub api_key: Option<String>,
    /// Custom API base URL
    pub api_base: Option<String>,
}

/// genai adapter for a provider id
pub fn adapter_kind_for(provider: &str) -> AdapterKind {
    match provider.to_lowercase().as_str() {
        "anthropic" => AdapterKind::Anthropic,
        "gemini" | "google" => AdapterKind::Gemini,
        "ollama" => AdapterKind::Ollama,
        "groq" => AdapterKind::Groq,
        "xai" => AdapterKind::Xai,
        "deepseek" => AdapterKind::DeepSeek,
        "cohere" => AdapterKind::Cohere,
        "fireworks" => AdapterKind::Fireworks,
        "together" => AdapterKind::Together,
        _ => AdapterKind::OpenAI,
    }
}

/// Fixed endpoint for OpenAI-compatible providers genai doesn't know natively
fn compat_endpoint(provider: &str) -> Option<&'static str> {
    match provider {
        "openrouter" => Some("https://openrouter.ai/api/v1/"),
        "mistral" => Some("https://api.mistral.ai/v1/"),
        _ => None,
    }
}

/// Create a genai Client with explicit auth and endpoint resolution
///
/// An explicit key wins; otherwise genai's own environment lookup applies.
/// A custom base URL routes through the provider's adapter.
pub fn create_client(config: &ProviderConfig) -> Client {
    let explicit_api_key = config.api_key.clone();

    let auth_resolver = AuthResolver::from_resolver_async_fn(
        move |_model_iden: ModelIden| -> Pin<Box<dyn Future<Output = genai::resolver::Result<Option<AuthData>>> + Send>> {
            let explicit_key = explicit_api_key.clone();
            Box::pin(async move { Ok(explicit_key.map(AuthData::from_single)) })
        },
    );

    let target_provider = config.provider.to_lowercase();
    let target_api_base = config.api_base.clone();

    let target_resolver = ServiceTargetResolver::from_resolver_fn(
        move |target: ServiceTarget| -> Result<ServiceTarget, genai::resolver::Error> {
            let endpoint = match (&target_api_base, compat_endpoint(&target_provider)) {
                (Some(base), _) => Endpoint::from_owned(base.clone()),
                (None, Some(fixed)) => Endpoint::from_static(fixed),
                // Native provider on its default endpoint
                (None, None) => return Ok(target),
            };

            let ServiceTarget { model, auth, .. } = target;
            let adapter_kind = adapter_kind_for(&target_provider);
            Ok(ServiceTarget {
                endpoint,
                auth,
                model: ModelIden::new(adapter_kind, model.model_name.clone()),
            })
        },
    );

    Client::builder()
        .with_auth_resolver(auth_resolver)
        .with_service_target_resolver(target_resolver)
        .build()
}

/// Check if a provider is natively supported by genai
pub fn is_genai_native(provider: &str) -> bool {
    matches!(
        provider.to_lowercase().as_str(),
        "openai"
            | "anthropic"
            | "gemini"
            | "ollama"
            | "groq"
            | "xai"
            | "deepseek"
            | "cohere"
            | "fireworks"
            | "together"
    )
}

/// Check if a provider can be handled by genai (native or via OpenAI-compat)
pub fn is_genai_supported(provider: &str) -> bool {
    is_genai_native(provider)
        || compat_endpoint(&provider.to_lowercase()).is_some()
}
