//! Tool registry: one namespace over local and remote tools
//!
//! The registry is built per prompt from the caller's local tools and
//! whatever the MCP pool currently serves. It:
//! - Describes every tool once, skipping those whose schema can't be built
//! - Resolves name collisions (local beats remote, otherwise first wins)
//! - Projects provider-facing schemas
//! - Executes tool calls, turning every failure into tool-result text

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::join_all;
use futures::FutureExt;

use crate::logging::SharedLogger;
use crate::mcp::McpPool;
use crate::types::{Message, ToolCallRequest, ToolSchema};

use super::descriptor::ToolDescriptor;
use super::error::{ToolError, ToolResult};
use super::function::LocalTool;
use super::source::ToolSource;

/// Registered tools in registration order
pub struct ToolRegistry {
    descriptors: Vec<ToolDescriptor>,
    index: HashMap<String, usize>,
    logger: SharedLogger,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new(logger: SharedLogger) -> Self {
        Self {
            descriptors: Vec::new(),
            index: HashMap::new(),
            logger,
        }
    }

    /// Register local tools, then the tools of every ready MCP connection
    ///
    /// A tool whose schema cannot be derived is logged and left out.
    pub fn build(
        local_tools: &[Arc<dyn LocalTool>],
        pool: Option<&Arc<McpPool>>,
        logger: SharedLogger,
    ) -> Self {
        let mut registry = Self::new(logger);

        for tool in local_tools {
            match ToolDescriptor::local(Arc::clone(tool)) {
                Ok(descriptor) => {
                    registry.register(descriptor);
                }
                Err(e) => registry
                    .logger
                    .warn(&format!("[ToolRegistry] Skipping local tool: {}", e)),
            }
        }

        if let Some(pool) = pool {
            for (server, meta) in pool.remote_tools() {
                match ToolDescriptor::remote(&server, &meta, pool) {
                    Ok(descriptor) => {
                        registry.register(descriptor);
                    }
                    Err(e) => registry
                        .logger
                        .warn(&format!("[ToolRegistry] Skipping remote tool: {}", e)),
                }
            }
        }

        registry.logger.debug(&format!(
            "[ToolRegistry] {} tools registered",
            registry.len()
        ));
        registry
    }

    /// Add a descriptor; returns `false` when an existing tool keeps the name
    ///
    /// A local tool replaces a remote one in place. Otherwise the earlier
    /// registration wins.
    pub fn register(&mut self, descriptor: ToolDescriptor) -> bool {
        let name = descriptor.name().to_string();
        let Some(&slot) = self.index.get(&name) else {
            self.index.insert(name, self.descriptors.len());
            self.descriptors.push(descriptor);
            return true;
        };

        let existing = &self.descriptors[slot];
        if descriptor.source.is_local() && !existing.source.is_local() {
            self.logger.debug(&format!(
                "[ToolRegistry] {} from {} shadows {}",
                name,
                descriptor.source.origin(),
                existing.source.origin()
            ));
            self.descriptors[slot] = descriptor;
            true
        } else {
            self.logger.debug(&format!(
                "[ToolRegistry] {} from {} shadowed by {}",
                name,
                descriptor.source.origin(),
                existing.source.origin()
            ));
            false
        }
    }

    /// Invocation strategy for `name`
    pub fn resolve(&self, name: &str) -> Option<&ToolSource> {
        self.get(name).map(|d| &d.source)
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(name).map(|&i| &self.descriptors[i])
    }

    /// Provider-facing schemas, in registration order
    pub fn schema_list(&self) -> Vec<ToolSchema> {
        self.descriptors.iter().map(|d| d.schema.clone()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.descriptors.iter().map(|d| d.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Execute one tool call and produce its tool-result message
    ///
    /// Never fails: errors are rendered into the message content.
    pub async fn execute(&self, call: &ToolCallRequest) -> Message {
        let outcome = AssertUnwindSafe(self.invoke(call))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| {
                Err(ToolError::failed(
                    call.name(),
                    format!("tool panicked: {}", panic_message(payload.as_ref())),
                ))
            });
        let content = match outcome {
            Ok(content) => content,
            Err(e) => {
                self.logger
                    .warn(&format!("[ToolRegistry] {} ({}): {}", call.name(), call.id, e));
                e.to_tool_content()
            }
        };
        Message::tool_result(call.id.clone(), call.name(), content)
    }

    /// Execute calls concurrently; results keep the order of `calls`
    pub async fn execute_all(&self, calls: &[ToolCallRequest]) -> Vec<Message> {
        join_all(calls.iter().map(|call| self.execute(call))).await
    }

    async fn invoke(&self, call: &ToolCallRequest) -> ToolResult<String> {
        let name = call.name();
        let args = call.parse_arguments().map_err(|e| {
            ToolError::invalid_arguments(
                name,
                format!("could not parse `{}` as JSON: {}", call.raw_arguments(), e),
            )
        })?;
        let source = self
            .resolve(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        self.logger.info(&format!(
            "[ToolRegistry] Calling tool: {} ({})",
            name,
            source.origin()
        ));
        source.invoke(args).await
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.descriptors)
            .finish()
    }
}
