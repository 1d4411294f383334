//! Connection seam between the pool and a transport

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::config::ServerConfig;
use super::error::McpResult;

/// Tool metadata as advertised by a server
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteToolMeta {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Value,
}

/// Flattened result of a remote tool call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteToolOutput {
    /// Text parts joined by newlines
    pub text: String,
    /// Server flagged the result as a tool-level failure
    pub is_error: bool,
}

impl RemoteToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

/// One live connection to an MCP server
///
/// Implementations must accept concurrent calls; the pool does not
/// serialize them.
#[async_trait]
pub trait McpConnection: Send + Sync {
    async fn list_tools(&self) -> McpResult<Vec<RemoteToolMeta>>;

    async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<RemoteToolOutput>;

    async fn close(&self) -> McpResult<()>;
}

/// Establishes connections from configuration entries
#[async_trait]
pub trait McpConnector: Send + Sync {
    async fn connect(&self, server: &ServerConfig) -> McpResult<Arc<dyn McpConnection>>;
}
