//! Provider response types, buffered and streamed

use serde::{Deserialize, Serialize};

use super::tool::ToolCallRequest;

/// Streaming chunk from an LLM response
///
/// Tool calls arrive as fragments keyed by `index`; the first fragment for an
/// index usually carries the id and name, later ones only argument text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamChunk {
    /// Text content chunk
    Text { text: String },
    /// Partial tool call
    ToolCallDelta {
        index: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(rename = "argumentsDelta", skip_serializing_if = "Option::is_none")]
        arguments_delta: Option<String>,
    },
    /// The provider finished this response
    Finish {
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

impl StreamChunk {
    /// Create a text chunk
    pub fn text(text: impl Into<String>) -> Self {
        StreamChunk::Text { text: text.into() }
    }

    /// Create a tool call fragment
    pub fn tool_call_delta(
        index: usize,
        id: Option<String>,
        name: Option<String>,
        arguments_delta: Option<String>,
    ) -> Self {
        StreamChunk::ToolCallDelta {
            index,
            id,
            name,
            arguments_delta,
        }
    }

    /// Create a finish marker
    pub fn finish(reason: impl Into<String>) -> Self {
        StreamChunk::Finish {
            reason: Some(reason.into()),
        }
    }

    /// Get the text content if this is a text chunk
    pub fn as_text(&self) -> Option<&str> {
        match self {
            StreamChunk::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// A complete (non-streamed or fully assembled) assistant response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub content: String,
    pub tool_calls: Vec<ToolCallRequest>,
    pub finish_reason: Option<String>,
}

impl Completion {
    /// Create a text-only completion
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    /// Create a completion requesting tool calls
    pub fn with_tool_calls(tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            tool_calls,
            finish_reason: Some("tool_calls".to_string()),
            ..Default::default()
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}
