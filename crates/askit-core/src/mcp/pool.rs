//! Pool of MCP server connections

use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use parking_lot::RwLock;
use serde_json::Value;

use crate::logging::SharedLogger;

use super::config::{McpServersConfig, ServerConfig};
use super::connection::{McpConnection, McpConnector, RemoteToolMeta, RemoteToolOutput};
use super::error::{McpError, McpResult};

/// Lifecycle of one configured server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Ready,
    Closed,
    /// Terminal; carries the reason
    Failed(String),
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Ready => write!(f, "ready"),
            ConnectionState::Closed => write!(f, "closed"),
            ConnectionState::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Snapshot of one connection, for callers that want to detect degraded mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub server: String,
    pub transport: &'static str,
    pub state: ConnectionState,
    pub tools: Vec<String>,
}

struct Entry {
    server: String,
    transport: &'static str,
    state: ConnectionState,
    connection: Option<Arc<dyn McpConnection>>,
    tools: Vec<RemoteToolMeta>,
}

/// Holds every configured connection
///
/// Shared across concurrent prompts. The lock is never held across an
/// await; calls to one server may run concurrently.
pub struct McpPool {
    connector: Arc<dyn McpConnector>,
    entries: RwLock<Vec<Entry>>,
    logger: SharedLogger,
}

impl McpPool {
    pub fn new(connector: Arc<dyn McpConnector>, logger: SharedLogger) -> Self {
        Self {
            connector,
            entries: RwLock::new(Vec::new()),
            logger,
        }
    }

    /// Connect every enabled server concurrently
    ///
    /// Failures are logged and recorded; they never abort the others.
    /// Returns the number of servers that became ready.
    pub async fn connect_all(&self, config: &McpServersConfig) -> usize {
        let mut pending: Vec<&ServerConfig> = Vec::new();
        {
            let mut entries = self.entries.write();
            for server in &config.servers {
                if server.disabled {
                    self.logger
                        .debug(&format!("[McpPool] Skipping disabled server {}", server.name));
                    continue;
                }
                if let Some(existing) = entries.iter().find(|e| e.server == server.name) {
                    match existing.state {
                        ConnectionState::Ready => {
                            self.logger.debug(&format!(
                                "[McpPool] {} already connected, keeping existing connection",
                                server.name
                            ));
                            continue;
                        }
                        // Another connect_all owns this attempt
                        ConnectionState::Connecting => {
                            self.logger.debug(&format!(
                                "[McpPool] {} is already connecting",
                                server.name
                            ));
                            continue;
                        }
                        _ => {}
                    }
                }
                entries.retain(|e| e.server != server.name);
                entries.push(Entry {
                    server: server.name.clone(),
                    transport: server.transport.kind(),
                    state: ConnectionState::Connecting,
                    connection: None,
                    tools: Vec::new(),
                });
                pending.push(server);
            }
        }

        let results = join_all(pending.iter().map(|server| self.connect_one(server))).await;

        let mut ready = 0;
        let mut entries = self.entries.write();
        for (server, result) in pending.into_iter().zip(results) {
            let Some(entry) = entries.iter_mut().find(|e| e.server == server.name) else {
                continue;
            };
            match result {
                Ok((connection, tools)) => {
                    self.logger.info(&format!(
                        "[McpPool] Connected to {} ({} tools)",
                        server.name,
                        tools.len()
                    ));
                    entry.state = ConnectionState::Ready;
                    entry.connection = Some(connection);
                    entry.tools = tools;
                    ready += 1;
                }
                Err(e) => {
                    self.logger.warn(&format!(
                        "[McpPool] Failed to connect to {}: {}",
                        server.name, e
                    ));
                    entry.state = ConnectionState::Failed(e.to_string());
                }
            }
        }
        ready
    }

    async fn connect_one(
        &self,
        server: &ServerConfig,
    ) -> McpResult<(Arc<dyn McpConnection>, Vec<RemoteToolMeta>)> {
        let connection = self.connector.connect(server).await?;
        match connection.list_tools().await {
            Ok(tools) => Ok((connection, tools)),
            Err(e) => {
                if let Err(close_err) = connection.close().await {
                    self.logger.debug(&format!(
                        "[McpPool] Close after failed listing of {}: {}",
                        server.name, close_err
                    ));
                }
                Err(e)
            }
        }
    }

    /// Tools of ready connections, in configured order
    pub fn remote_tools(&self) -> Vec<(String, RemoteToolMeta)> {
        self.entries
            .read()
            .iter()
            .filter(|e| e.state == ConnectionState::Ready)
            .flat_map(|e| e.tools.iter().map(move |t| (e.server.clone(), t.clone())))
            .collect()
    }

    /// Names of tools served by ready connections
    pub fn tool_names(&self) -> Vec<String> {
        self.remote_tools().into_iter().map(|(_, t)| t.name).collect()
    }

    pub fn statuses(&self) -> Vec<ConnectionStatus> {
        self.entries
            .read()
            .iter()
            .map(|e| ConnectionStatus {
                server: e.server.clone(),
                transport: e.transport,
                state: e.state.clone(),
                tools: e.tools.iter().map(|t| t.name.clone()).collect(),
            })
            .collect()
    }

    pub fn state(&self, server: &str) -> Option<ConnectionState> {
        self.entries
            .read()
            .iter()
            .find(|e| e.server == server)
            .map(|e| e.state.clone())
    }

    /// Invoke `tool` on `server`
    ///
    /// Calls on a connection that is not ready fail without being attempted.
    /// A transport failure marks the connection failed.
    pub async fn call_tool(
        &self,
        server: &str,
        tool: &str,
        arguments: Value,
    ) -> McpResult<RemoteToolOutput> {
        let connection = {
            let entries = self.entries.read();
            let entry = entries
                .iter()
                .find(|e| e.server == server)
                .ok_or_else(|| McpError::UnknownServer(server.to_string()))?;
            match (&entry.state, &entry.connection) {
                (ConnectionState::Ready, Some(connection)) => Arc::clone(connection),
                (state, _) => {
                    return Err(McpError::Unavailable {
                        server: server.to_string(),
                        reason: state.to_string(),
                    })
                }
            }
        };

        let result = connection.call_tool(tool, arguments).await;
        if let Err(e) = &result {
            if e.is_transport_closed() {
                self.mark_failed(server, e.to_string());
            }
        }
        result
    }

    fn mark_failed(&self, server: &str, reason: String) {
        let mut entries = self.entries.write();
        if let Some(entry) = entries.iter_mut().find(|e| e.server == server) {
            self.logger.warn(&format!(
                "[McpPool] Connection to {} failed: {}",
                server, reason
            ));
            entry.state = ConnectionState::Failed(reason);
            entry.connection = None;
        }
    }

    /// Close every open connection, collecting failures
    pub async fn close_all(&self) -> Vec<(String, McpError)> {
        let open: Vec<(String, Arc<dyn McpConnection>)> = {
            let mut entries = self.entries.write();
            entries
                .iter_mut()
                .filter_map(|e| {
                    let connection = e.connection.take()?;
                    if e.state == ConnectionState::Ready || e.state == ConnectionState::Connecting {
                        e.state = ConnectionState::Closed;
                    }
                    Some((e.server.clone(), connection))
                })
                .collect()
        };

        let results = join_all(open.iter().map(|(_, c)| c.close())).await;

        open.into_iter()
            .zip(results)
            .filter_map(|((server, _), result)| match result {
                Ok(()) => None,
                Err(e) => {
                    self.logger
                        .warn(&format!("[McpPool] Failed to close {}: {}", server, e));
                    Some((server, e))
                }
            })
            .collect()
    }
}

impl fmt::Debug for McpPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("McpPool")
            .field("statuses", &self.statuses())
            .finish()
    }
}
