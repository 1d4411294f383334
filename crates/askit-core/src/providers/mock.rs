//! Mock provider for testing
//!
//! Plays back scripted turns without network dependencies, one turn per
//! request, and records every request it receives. Once the script runs out
//! it echoes the last user message.

use async_trait::async_trait;
use futures::{stream, StreamExt};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use super::error::{ProviderError, ProviderResult};
use super::traits::{ChatOptions, Provider, ProviderModelConfig, StreamResponse};
use crate::logging::Logger;
use crate::types::{CancellationToken, Message, Role, StreamChunk, ToolCallRequest, ToolSchema};

/// One scripted response
#[derive(Debug, Clone)]
pub enum MockTurn {
    /// Plain text, streamed as the given chunks
    Text(Vec<String>),
    /// Optional text followed by tool calls, each split into fragments
    ToolCalls {
        text: Vec<String>,
        calls: Vec<ToolCallRequest>,
    },
    /// Exactly these chunks
    Chunks(Vec<StreamChunk>),
    /// The request itself fails
    Fail(String),
    /// Some text, then the stream breaks
    Broken { text: Vec<String>, message: String },
    /// Produce nothing until cancelled
    Hang,
}

impl MockTurn {
    /// Text turn from string slices
    pub fn text(chunks: &[&str]) -> Self {
        MockTurn::Text(chunks.iter().map(|c| c.to_string()).collect())
    }

    /// Tool-call turn with no text
    pub fn calls(calls: Vec<ToolCallRequest>) -> Self {
        MockTurn::ToolCalls {
            text: Vec::new(),
            calls,
        }
    }

    /// Tool-call turn requesting a single call
    pub fn call(id: &str, name: &str, arguments: &str) -> Self {
        Self::calls(vec![ToolCallRequest::new(id, name, arguments)])
    }
}

/// What the provider was asked
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    pub tools: Option<Vec<ToolSchema>>,
}

impl RecordedRequest {
    pub fn tool_names(&self) -> Vec<String> {
        self.tools
            .iter()
            .flatten()
            .map(|t| t.name.clone())
            .collect()
    }
}

/// Mock LLM provider for testing
pub struct MockProvider {
    script: Mutex<VecDeque<MockTurn>>,
    requests: Mutex<Vec<RecordedRequest>>,
    /// Delay between chunks in milliseconds (0 = no delay)
    chunk_delay_ms: u64,
    logger: Arc<dyn Logger>,
}

impl MockProvider {
    /// A provider that only echoes
    pub fn echo(logger: Arc<dyn Logger>) -> Self {
        Self::scripted(Vec::new(), logger)
    }

    /// Play `turns` in order, then echo
    pub fn scripted(turns: Vec<MockTurn>, logger: Arc<dyn Logger>) -> Self {
        Self {
            script: Mutex::new(turns.into()),
            requests: Mutex::new(Vec::new()),
            chunk_delay_ms: 0,
            logger,
        }
    }

    /// Set chunk delay
    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.chunk_delay_ms = delay_ms;
        self
    }

    /// Queue another turn
    pub fn push_turn(&self, turn: MockTurn) {
        self.script.lock().push_back(turn);
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn last_user_message(messages: &[Message]) -> String {
        messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User && !m.content.is_empty())
            .map(|m| m.content.clone())
            .unwrap_or_else(|| "Hello from MockProvider!".to_string())
    }

    fn chunks_for(turn: MockTurn) -> Vec<ProviderResult<StreamChunk>> {
        match turn {
            MockTurn::Text(text) => text
                .into_iter()
                .map(StreamChunk::text)
                .chain([StreamChunk::finish("stop")])
                .map(Ok)
                .collect(),
            MockTurn::ToolCalls { text, calls } => {
                let mut chunks: Vec<StreamChunk> = text.into_iter().map(StreamChunk::text).collect();
                for (index, call) in calls.into_iter().enumerate() {
                    // Split arguments the way real providers fragment them
                    let raw = call.function.arguments;
                    let mid = raw.char_indices().nth(raw.chars().count() / 2).map_or(0, |(i, _)| i);
                    let (head, tail) = raw.split_at(mid);
                    chunks.push(StreamChunk::tool_call_delta(
                        index,
                        Some(call.id),
                        Some(call.function.name),
                        Some(head.to_string()),
                    ));
                    chunks.push(StreamChunk::tool_call_delta(index, None, None, Some(tail.to_string())));
                }
                chunks.push(StreamChunk::finish("tool_calls"));
                chunks.into_iter().map(Ok).collect()
            }
            MockTurn::Chunks(chunks) => chunks.into_iter().map(Ok).collect(),
            MockTurn::Broken { text, message } => text
                .into_iter()
                .map(|t| Ok(StreamChunk::text(t)))
                .chain([Err(ProviderError::stream("mock", message))])
                .collect(),
            MockTurn::Fail(_) | MockTurn::Hang => Vec::new(),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn stream_chat(
        &self,
        messages: Vec<Message>,
        _model: ProviderModelConfig,
        options: ChatOptions,
        cancel_token: CancellationToken,
    ) -> ProviderResult<StreamResponse> {
        let echo = Self::last_user_message(&messages);
        self.requests.lock().push(RecordedRequest {
            messages,
            tools: options.tools,
        });

        let turn = self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| MockTurn::Text(vec![format!("Echo: {}", echo)]));
        self.logger
            .debug(&format!("[MockProvider] stream_chat playing {:?}", turn));

        match turn {
            MockTurn::Fail(message) => return Err(ProviderError::request("mock", message)),
            MockTurn::Hang => {
                let stream = stream::once(async move {
                    cancel_token.cancelled().await;
                    Err(ProviderError::Cancelled)
                });
                return Ok(Box::pin(stream));
            }
            _ => {}
        }

        let delay_ms = self.chunk_delay_ms;
        let stream = stream::iter(Self::chunks_for(turn).into_iter().enumerate()).then(
            move |(i, chunk)| {
                let cancel = cancel_token.clone();
                async move {
                    if i > 0 && delay_ms > 0 {
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    }
                    if cancel.is_cancelled() {
                        return Err(ProviderError::Cancelled);
                    }
                    chunk
                }
            },
        );

        Ok(Box::pin(stream))
    }
}
