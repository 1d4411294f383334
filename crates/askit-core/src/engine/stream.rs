//! Streaming adapter
//!
//! Text is forwarded as soon as it arrives; tool-call fragments are held
//! until the response ends and then assembled into whole calls.

use std::collections::BTreeMap;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;

use crate::types::{CancellationToken, Completion, Message, StreamChunk, ToolCallRequest};

use super::error::EngineResult;

#[derive(Debug, Default)]
struct PartialCall {
    id: Option<String>,
    name: String,
    arguments: String,
}

/// Buffers one response's chunks into a [`Completion`]
#[derive(Debug, Default)]
pub struct ToolCallAssembler {
    content: String,
    calls: BTreeMap<usize, PartialCall>,
    finish_reason: Option<String>,
}

impl ToolCallAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take one chunk; returns text that should be shown right away
    pub fn push(&mut self, chunk: StreamChunk) -> Option<String> {
        match chunk {
            StreamChunk::Text { text } => {
                if text.is_empty() {
                    return None;
                }
                self.content.push_str(&text);
                Some(text)
            }
            StreamChunk::ToolCallDelta {
                index,
                id,
                name,
                arguments_delta,
            } => {
                let call = self.calls.entry(index).or_default();
                if let Some(id) = id.filter(|id| !id.is_empty()) {
                    call.id = Some(id);
                }
                if let Some(name) = name {
                    call.name.push_str(&name);
                }
                if let Some(delta) = arguments_delta {
                    call.arguments.push_str(&delta);
                }
                None
            }
            StreamChunk::Finish { reason } => {
                self.finish_reason = reason;
                None
            }
        }
    }

    /// Whether any tool-call fragment has been seen
    pub fn has_tool_calls(&self) -> bool {
        !self.calls.is_empty()
    }

    /// Assemble the buffered response; calls come out in index order
    ///
    /// A call whose id never arrived gets `call_{index}`.
    pub fn finish(self) -> Completion {
        let tool_calls = self
            .calls
            .into_iter()
            .map(|(index, call)| {
                let id = call.id.unwrap_or_else(|| format!("call_{}", index));
                ToolCallRequest::new(id, call.name, call.arguments)
            })
            .collect();

        Completion {
            content: self.content,
            tool_calls,
            finish_reason: self.finish_reason,
        }
    }
}

/// Event yielded by [`PromptStream`]
#[derive(Debug, Clone, PartialEq)]
pub enum PromptEvent {
    /// Assistant text, as it arrives
    Text(String),
    /// A tool finished; emitted in request order once the whole round is done
    ToolResult {
        call_id: String,
        name: String,
        content: String,
    },
    /// The final answer and the full transcript that produced it
    Done {
        content: String,
        transcript: Vec<Message>,
    },
}

impl PromptEvent {
    pub(crate) fn tool_result(message: &Message) -> Self {
        PromptEvent::ToolResult {
            call_id: message.tool_call_id.clone().unwrap_or_default(),
            name: message.name.clone().unwrap_or_default(),
            content: message.content.clone(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PromptEvent::Text(text) => Some(text),
            _ => None,
        }
    }
}

type BoxedEvents = Pin<Box<dyn Stream<Item = EngineResult<PromptEvent>> + Send>>;

/// Forward-only stream of a streamed prompt
///
/// Ends after `Done` or the first error. Dropping it cancels whatever the
/// prompt is still doing.
pub struct PromptStream {
    inner: BoxedEvents,
    cancel: CancellationToken,
}

impl PromptStream {
    pub(crate) fn new(inner: BoxedEvents, cancel: CancellationToken) -> Self {
        Self { inner, cancel }
    }

    /// Cancel the prompt; the stream then ends with `EngineError::Cancelled`
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Stream for PromptStream {
    type Item = EngineResult<PromptEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl Drop for PromptStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for PromptStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptStream")
            .field("cancel", &self.cancel)
            .finish()
    }
}
