//! Core types for LLM interactions
//!
//! This module contains the transcript, tool-call and streaming types shared
//! by the registry, the providers and the orchestrator.

mod message;
mod tool;
mod stream;
mod cancellation;

pub use message::{check_pairing, Message, Role, TranscriptError};
pub use tool::{FunctionCall, ToolCallKind, ToolCallRequest, ToolSchema};
pub use stream::{Completion, StreamChunk};
pub use cancellation::CancellationToken;
