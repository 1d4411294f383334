//! Transcript message types

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::tool::ToolCallRequest;

/// Message role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// One transcript entry
///
/// Serializes to the chat-completions message shape: `tool_calls` only on
/// assistant messages that requested tools, `tool_call_id` and `name` only
/// on tool results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallRequest>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
            name: None,
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    /// Create an assistant message that requests tool calls
    pub fn assistant_tool_calls(content: impl Into<String>, calls: Vec<ToolCallRequest>) -> Self {
        Self {
            tool_calls: Some(calls),
            ..Self::plain(Role::Assistant, content)
        }
    }

    /// Create a tool result message answering `call_id`
    pub fn tool_result(
        call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            tool_call_id: Some(call_id.into()),
            name: Some(name.into()),
            ..Self::plain(Role::Tool, content)
        }
    }

    /// Tool calls requested by this message (empty for anything but assistant requests)
    pub fn requested_calls(&self) -> &[ToolCallRequest] {
        self.tool_calls.as_deref().unwrap_or_default()
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.requested_calls().is_empty()
    }
}

/// A broken `tool_call_id` pairing in a transcript
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranscriptError {
    #[error("tool message at index {index} has no tool_call_id")]
    MissingCallId { index: usize },

    #[error("tool message at index {index} answers unknown call `{call_id}`")]
    UnknownCallId { index: usize, call_id: String },

    #[error("tool message at index {index} answers call `{call_id}` a second time")]
    DuplicateAnswer { index: usize, call_id: String },
}

/// Check that every tool message answers a call requested by an earlier
/// assistant message, and answers it only once.
pub fn check_pairing(messages: &[Message]) -> Result<(), TranscriptError> {
    let mut requested: HashSet<&str> = HashSet::new();
    let mut answered: HashSet<&str> = HashSet::new();

    for (index, msg) in messages.iter().enumerate() {
        match msg.role {
            Role::Assistant => {
                requested.extend(msg.requested_calls().iter().map(|c| c.id.as_str()));
            }
            Role::Tool => {
                let call_id = msg
                    .tool_call_id
                    .as_deref()
                    .ok_or(TranscriptError::MissingCallId { index })?;
                if !requested.contains(call_id) {
                    return Err(TranscriptError::UnknownCallId {
                        index,
                        call_id: call_id.to_string(),
                    });
                }
                if !answered.insert(call_id) {
                    return Err(TranscriptError::DuplicateAnswer {
                        index,
                        call_id: call_id.to_string(),
                    });
                }
            }
            Role::System | Role::User => {}
        }
    }

    Ok(())
}
