//! How a registered tool is invoked

use std::sync::{Arc, Weak};

use serde_json::Value;

use crate::mcp::{McpError, McpPool};

use super::error::{ToolError, ToolResult};
use super::function::{render_output, LocalTool};

/// Invocation strategy behind a tool name
#[derive(Clone)]
pub enum ToolSource {
    /// In-process callable
    Local(Arc<dyn LocalTool>),
    /// Tool served by an MCP connection
    ///
    /// Holds the pool weakly and the connection by id only; the pool owns
    /// every connection's lifetime.
    Remote {
        server: String,
        tool: String,
        pool: Weak<McpPool>,
    },
}

impl ToolSource {
    pub fn remote(server: impl Into<String>, tool: impl Into<String>, pool: &Arc<McpPool>) -> Self {
        ToolSource::Remote {
            server: server.into(),
            tool: tool.into(),
            pool: Arc::downgrade(pool),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, ToolSource::Local(_))
    }

    /// Where the tool comes from, for logs (`local` or `mcp:<server>`)
    pub fn origin(&self) -> String {
        match self {
            ToolSource::Local(_) => "local".to_string(),
            ToolSource::Remote { server, .. } => format!("mcp:{}", server),
        }
    }

    /// Invoke the tool and render its result as transcript text
    pub async fn invoke(&self, args: Value) -> ToolResult<String> {
        match self {
            ToolSource::Local(tool) => tool.call(args).await.map(|v| render_output(&v)),
            ToolSource::Remote { server, tool, pool } => {
                let pool = pool
                    .upgrade()
                    .ok_or_else(|| ToolError::unavailable(tool, "connection pool was closed"))?;
                let output = pool
                    .call_tool(server, tool, args)
                    .await
                    .map_err(|e| match e {
                        McpError::ToolCallFailed { reason, .. } | McpError::Protocol { reason, .. } => {
                            ToolError::failed(tool, reason)
                        }
                        other => ToolError::unavailable(tool, other.to_string()),
                    })?;
                if output.is_error {
                    Err(ToolError::failed(tool, output.text))
                } else {
                    Ok(output.text)
                }
            }
        }
    }
}

impl std::fmt::Debug for ToolSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolSource::Local(tool) => f.debug_tuple("Local").field(&tool.spec().name).finish(),
            ToolSource::Remote { server, tool, .. } => f
                .debug_struct("Remote")
                .field("server", server)
                .field("tool", tool)
                .finish(),
        }
    }
}
