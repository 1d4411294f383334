//! Tool management module
//!
//! Ready-made tools (clock, sandboxed files) live in [`builtin`].
//!
//! Local functions and MCP server tools share one namespace. Each tool is
//! described once (name, description, JSON-schema parameters) and carries a
//! [`ToolSource`] saying how to invoke it.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  ToolRegistry (built per prompt)            │
//! │                                             │
//! │  - Local tools first, then MCP tools        │
//! │  - Local shadows remote on name collision   │
//! │  - Schemas for the provider                 │
//! │  - Executes calls, errors become text       │
//! └─────────────────────────────────────────────┘
//!           │                       │
//!           │ in-process call       │ tools/call
//!           ▼                       ▼
//! ┌───────────────────┐   ┌─────────────────────┐
//! │  LocalTool        │   │  McpPool            │
//! │  (FunctionTool)   │   │  (stdio / http)     │
//! └───────────────────┘   └─────────────────────┘
//! ```

pub mod builtin;
mod descriptor;
mod error;
mod function;
mod registry;
mod source;

pub use descriptor::{describe_local, describe_remote, ParamSpec, ParamType, ToolDescriptor, ToolSpec};
pub use error::{SchemaError, ToolError, ToolResult};
pub use function::{check_arguments, render_output, FunctionTool, LocalTool};
pub use registry::ToolRegistry;
pub use source::ToolSource;
