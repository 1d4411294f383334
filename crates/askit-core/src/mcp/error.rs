use thiserror::Error;

/// MCP connection and call errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum McpError {
    #[error("Connection to `{server}` failed: {reason}")]
    ConnectionFailed { server: String, reason: String },

    #[error("Initialization of `{server}` failed: {reason}")]
    InitializationFailed { server: String, reason: String },

    /// The connection is not `Ready`; calls fail without being attempted
    #[error("Server `{server}` is unavailable: {reason}")]
    Unavailable { server: String, reason: String },

    #[error("Unknown MCP server `{0}`")]
    UnknownServer(String),

    #[error("Tool call `{tool}` on `{server}` failed: {reason}")]
    ToolCallFailed {
        server: String,
        tool: String,
        reason: String,
    },

    /// The transport is gone (child exited, endpoint unreachable)
    #[error("Transport to `{server}` closed: {reason}")]
    TransportClosed { server: String, reason: String },

    #[error("Protocol error from `{server}`: {reason}")]
    Protocol { server: String, reason: String },
}

impl McpError {
    /// Whether the connection should be considered dead after this error
    pub fn is_transport_closed(&self) -> bool {
        matches!(self, McpError::TransportClosed { .. })
    }

    pub fn server(&self) -> &str {
        match self {
            McpError::ConnectionFailed { server, .. }
            | McpError::InitializationFailed { server, .. }
            | McpError::Unavailable { server, .. }
            | McpError::ToolCallFailed { server, .. }
            | McpError::TransportClosed { server, .. }
            | McpError::Protocol { server, .. } => server,
            McpError::UnknownServer(server) => server,
        }
    }
}

pub type McpResult<T> = Result<T, McpError>;
