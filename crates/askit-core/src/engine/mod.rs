//! Conversation engine
//!
//! [`AskIt`] owns a provider, default tools and the MCP connection pool.
//! Each prompt builds a fresh [`ToolRegistry`](crate::tools::ToolRegistry)
//! and runs the bounded tool-call loop, either to a final string or as a
//! [`PromptStream`] of [`PromptEvent`]s.

mod error;
mod orchestrator;
mod stream;

pub use error::{EngineError, EngineResult};
pub use orchestrator::{AskIt, PromptOptions};
pub use stream::{PromptEvent, PromptStream, ToolCallAssembler};
