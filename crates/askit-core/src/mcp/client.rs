//! MCP client using the official rmcp SDK
//!
//! Connects to MCP servers over a child process's stdio or Streamable HTTP.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rmcp::{
    model::{
        CallToolRequestParams, CallToolResult, ClientCapabilities, ClientInfo, Implementation,
        RawContent, Tool,
    },
    service::{Peer, RunningService, ServiceError},
    transport::{StreamableHttpClientTransport, TokioChildProcess},
    RoleClient, ServiceExt,
};
use serde_json::Value;
use tokio::process::Command;

use crate::logging::SharedLogger;

use super::config::{ServerConfig, ServerTransport};
use super::connection::{McpConnection, McpConnector, RemoteToolMeta, RemoteToolOutput};
use super::error::{McpError, McpResult};

fn client_info() -> ClientInfo {
    ClientInfo {
        meta: None,
        protocol_version: Default::default(),
        capabilities: ClientCapabilities::default(),
        client_info: Implementation {
            name: "askit-core".to_string(),
            title: Some("AskIt".to_string()),
            version: env!("CARGO_PKG_VERSION").to_string(),
            website_url: None,
            icons: None,
        },
    }
}

/// rmcp-backed connection to one server
pub struct McpClient {
    server: String,
    /// Request handle; cloned out of the service so calls need no lock
    peer: Peer<RoleClient>,
    /// Taken on close
    service: Mutex<Option<RunningService<RoleClient, ClientInfo>>>,
    logger: SharedLogger,
}

impl McpClient {
    /// Spawn `command` and speak MCP over its stdio
    pub async fn connect_stdio(
        server: &str,
        command: &str,
        args: &[String],
        cwd: Option<&std::path::Path>,
        env: &[(String, String)],
        logger: SharedLogger,
    ) -> McpResult<Self> {
        logger.info(&format!("[McpClient] Spawning `{}` for {}", command, server));

        let mut cmd = Command::new(command);
        cmd.args(args);
        for (key, value) in env {
            cmd.env(key, value);
        }
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        let transport = TokioChildProcess::new(cmd).map_err(|e| McpError::ConnectionFailed {
            server: server.to_string(),
            reason: e.to_string(),
        })?;

        let service = client_info()
            .serve(transport)
            .await
            .map_err(|e| McpError::InitializationFailed {
                server: server.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self::from_service(server, service, logger))
    }

    /// Connect to a Streamable HTTP endpoint
    pub async fn connect_http(server: &str, url: &str, logger: SharedLogger) -> McpResult<Self> {
        logger.info(&format!("[McpClient] Connecting to HTTP: {} ({})", url, server));

        let transport = StreamableHttpClientTransport::from_uri(url);

        let service = client_info()
            .serve(transport)
            .await
            .map_err(|e| McpError::InitializationFailed {
                server: server.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self::from_service(server, service, logger))
    }

    fn from_service(
        server: &str,
        service: RunningService<RoleClient, ClientInfo>,
        logger: SharedLogger,
    ) -> Self {
        let peer = service.peer().clone();
        if let Some(info) = peer.peer_info() {
            logger.info(&format!(
                "[McpClient] {} initialized ({} {})",
                server, info.server_info.name, info.server_info.version
            ));
        }
        Self {
            server: server.to_string(),
            peer,
            service: Mutex::new(Some(service)),
            logger,
        }
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    fn call_error(&self, tool: &str, err: ServiceError) -> McpError {
        match err {
            ServiceError::TransportClosed | ServiceError::TransportSend(_) => {
                McpError::TransportClosed {
                    server: self.server.clone(),
                    reason: err.to_string(),
                }
            }
            other => McpError::ToolCallFailed {
                server: self.server.clone(),
                tool: tool.to_string(),
                reason: other.to_string(),
            },
        }
    }
}

#[async_trait]
impl McpConnection for McpClient {
    async fn list_tools(&self) -> McpResult<Vec<RemoteToolMeta>> {
        let result = self
            .peer
            .list_tools(Default::default())
            .await
            .map_err(|e| McpError::Protocol {
                server: self.server.clone(),
                reason: e.to_string(),
            })?;

        self.logger.info(&format!(
            "[McpClient] {} listed {} tools",
            self.server,
            result.tools.len()
        ));

        Ok(result.tools.into_iter().map(tool_meta).collect())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<RemoteToolOutput> {
        self.logger
            .debug(&format!("[McpClient] Calling {} on {}", name, self.server));

        let params = CallToolRequestParams {
            meta: None,
            name: name.to_owned().into(),
            arguments: arguments.as_object().cloned(),
            task: None,
        };

        let result = self
            .peer
            .call_tool(params)
            .await
            .map_err(|e| self.call_error(name, e))?;

        Ok(flatten_result(result))
    }

    async fn close(&self) -> McpResult<()> {
        let service = self.service.lock().take();
        let Some(service) = service else {
            return Ok(());
        };
        self.logger
            .info(&format!("[McpClient] Closing connection to {}", self.server));
        service.cancel().await.map_err(|e| McpError::Protocol {
            server: self.server.clone(),
            reason: e.to_string(),
        })?;
        Ok(())
    }
}

fn tool_meta(tool: Tool) -> RemoteToolMeta {
    RemoteToolMeta {
        name: tool.name.to_string(),
        description: tool.description.map(|d| d.to_string()),
        input_schema: Value::Object(tool.input_schema.as_ref().clone()),
    }
}

fn flatten_result(result: CallToolResult) -> RemoteToolOutput {
    let mut parts: Vec<String> = result
        .content
        .iter()
        .map(|content| match &content.raw {
            RawContent::Text(text) => text.text.clone(),
            other => serde_json::to_string(other).unwrap_or_default(),
        })
        .collect();

    if parts.is_empty() {
        if let Some(structured) = &result.structured_content {
            parts.push(structured.to_string());
        }
    }

    RemoteToolOutput {
        text: parts.join("\n"),
        is_error: result.is_error.unwrap_or(false),
    }
}

/// Default connector: stdio via child process, HTTP via Streamable HTTP
pub struct RmcpConnector {
    logger: SharedLogger,
}

impl RmcpConnector {
    pub fn new(logger: SharedLogger) -> Self {
        Self { logger }
    }
}

#[async_trait]
impl McpConnector for RmcpConnector {
    async fn connect(&self, server: &ServerConfig) -> McpResult<Arc<dyn McpConnection>> {
        let client = match &server.transport {
            ServerTransport::Stdio {
                command,
                args,
                cwd,
                env,
            } => {
                McpClient::connect_stdio(
                    &server.name,
                    command,
                    args,
                    cwd.as_deref(),
                    env,
                    Arc::clone(&self.logger),
                )
                .await?
            }
            ServerTransport::Http { url } => {
                McpClient::connect_http(&server.name, url, Arc::clone(&self.logger)).await?
            }
        };
        Ok(Arc::new(client))
    }
}
