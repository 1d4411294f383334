use thiserror::Error;

use crate::config::ConfigError;
use crate::mcp::McpError;
use crate::providers::ProviderError;

/// Errors that end a prompt
///
/// Tool and MCP connection failures never show up here; they are absorbed
/// into the transcript or the pool's connection statuses.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The model asked for tools on the round where tools were withheld
    #[error("provider requested tool call(s) [{}] on final round {round} after tools were withheld", .calls.join(", "))]
    Protocol { round: usize, calls: Vec<String> },

    /// The LLM request itself failed
    #[error("LLM request failed: {0}")]
    Transport(ProviderError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("prompt cancelled")]
    Cancelled,

    /// Some MCP connections failed to close; all were attempted
    #[error("failed to close {} MCP connection(s)", .0.len())]
    Close(Vec<(String, McpError)>),
}

impl From<ProviderError> for EngineError {
    fn from(err: ProviderError) -> Self {
        if err.is_cancelled() {
            EngineError::Cancelled
        } else {
            EngineError::Transport(err)
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
