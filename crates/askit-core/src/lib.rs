//! AskIt Core
//!
//! Tool orchestration engine: one LLM tool-calling loop over local Rust
//! functions and tools served by MCP servers (stdio child processes or
//! streamable HTTP).
//!
//! ## Conversation Loop
//!
//! Each prompt runs at most `R` tool rounds (`max_tool_calls`). Tools are
//! offered while the round counter is below `R`; after that the model must
//! answer in text, and asking for tools anyway ends the prompt with
//! [`EngineError::Protocol`].
//!
//! ```rust,ignore
//! use askit_core::{AskIt, EngineSettings, PromptOptions};
//!
//! let askit = AskIt::from_settings(EngineSettings::default(), logger);
//! askit.load_mcp_config("mcp_config.json").await?;
//!
//! // Final answer
//! let answer = askit.prompt("What time is it in Tokyo?", PromptOptions::new()).await?;
//!
//! // Or as a stream of text and tool results
//! let mut events = askit.prompt_stream("And in Paris?", Vec::new(), PromptOptions::new());
//! while let Some(event) = events.next().await {
//!     // ...
//! }
//!
//! askit.close().await?;
//! ```

pub mod types;
pub mod logging;
pub mod config;
pub mod providers;
pub mod tools;
pub mod mcp;
pub mod engine;

// Re-export commonly used types
pub use types::{
    Message, Role, TranscriptError, check_pairing,
    ToolCallRequest, ToolSchema,
    StreamChunk, Completion,
    CancellationToken,
};

pub use logging::{Logger, SharedLogger, NoOpLogger, ConsoleLogger, MemoryLogger};

pub use config::{ConfigError, EngineSettings, SettingsOverrides, DEFAULT_SYSTEM_PROMPT};

pub use providers::{create_provider, Provider, ProviderError, MockProvider, MockTurn};

pub use tools::{FunctionTool, LocalTool, ParamSpec, ParamType, ToolError, ToolRegistry, ToolSpec};

// MCP client using official rmcp SDK
pub use mcp::{ConnectionState, ConnectionStatus, McpError, McpPool, McpServersConfig};

pub use engine::{AskIt, EngineError, EngineResult, PromptEvent, PromptOptions, PromptStream};
