//! MCP (Model Context Protocol) client module
//!
//! Uses the official rmcp SDK to connect to MCP servers over a child
//! process's stdio or Streamable HTTP. The [`McpPool`] owns every connection;
//! tools elsewhere refer to them by server name only.
//!
//! # Example
//!
//! ```rust,ignore
//! use askit_core::mcp::{McpPool, McpServersConfig, RmcpConnector};
//! use std::sync::Arc;
//!
//! let logger: SharedLogger = Arc::new(NoOpLogger::new());
//! let pool = McpPool::new(Arc::new(RmcpConnector::new(logger.clone())), logger);
//!
//! let config = McpServersConfig::load("mcp_config.json")?;
//! pool.connect_all(&config).await;
//!
//! let result = pool.call_tool("time", "get_current_time", json!({
//!     "timezone": "UTC"
//! })).await?;
//!
//! pool.close_all().await;
//! ```

mod client;
mod config;
mod connection;
mod error;
mod pool;

pub use client::{McpClient, RmcpConnector};
pub use config::{expand_env_placeholders, McpServersConfig, ServerConfig, ServerTransport};
pub use connection::{McpConnection, McpConnector, RemoteToolMeta, RemoteToolOutput};
pub use error::{McpError, McpResult};
pub use pool::{ConnectionState, ConnectionStatus, McpPool};

#[cfg(test)]
pub(crate) use pool::testing;
