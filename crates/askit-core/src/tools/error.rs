//! Tool error types

use thiserror::Error;

/// A tool's call schema could not be derived
///
/// Fatal to registering that one tool, never to the session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("tool metadata from `{server}` is missing a name")]
    MissingName { server: String },

    #[error("invalid tool name `{name}`: use 1-64 letters, digits, `_` or `-`")]
    InvalidName { name: String },

    #[error("tool `{tool}` declares parameter `{param}` more than once")]
    DuplicateParameter { tool: String, param: String },

    #[error("tool `{tool}` parameter `{param}` has an unresolvable type: {reason}")]
    UnresolvableType {
        tool: String,
        param: String,
        reason: String,
    },
}

/// A tool invocation failed
///
/// Recovered by rendering into the tool-result message so the model can react;
/// never propagated to the caller of `prompt()`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("unknown tool `{0}`")]
    NotFound(String),

    #[error("invalid arguments for tool `{tool}`: {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("tool `{tool}` failed: {message}")]
    Failed { tool: String, message: String },

    #[error("tool `{tool}` is unavailable: {reason}")]
    Unavailable { tool: String, reason: String },
}

impl ToolError {
    pub fn invalid_arguments(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    pub fn failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn unavailable(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    /// Text placed in the tool-result message
    pub fn to_tool_content(&self) -> String {
        format!("Error: {}", self)
    }
}

pub type ToolResult<T> = Result<T, ToolError>;
