//! MCP server configuration file
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "time": { "command": "uvx", "args": ["mcp-server-time"] },
//!     "search": { "transport": "http", "url": "https://example.com/mcp" },
//!     "old": { "transport": "http", "url": "http://localhost:9000/mcp", "disabled": true }
//!   }
//! }
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::{ConfigError, ConfigResult};

/// How the engine reaches a server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerTransport {
    /// Spawn a child process and speak MCP over its stdio
    Stdio {
        command: String,
        args: Vec<String>,
        cwd: Option<PathBuf>,
        env: Vec<(String, String)>,
    },
    /// Streamable HTTP endpoint
    Http { url: String },
}

impl ServerTransport {
    /// `stdio` or `http`
    pub fn kind(&self) -> &'static str {
        match self {
            ServerTransport::Stdio { .. } => "stdio",
            ServerTransport::Http { .. } => "http",
        }
    }
}

/// One entry under `mcpServers`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub name: String,
    pub disabled: bool,
    pub transport: ServerTransport,
}

/// Parsed configuration, servers in file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct McpServersConfig {
    pub servers: Vec<ServerConfig>,
}

#[derive(Debug, Deserialize)]
struct RawFile {
    #[serde(rename = "mcpServers", default)]
    mcp_servers: Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawEntry {
    command: Option<String>,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    env: HashMap<String, String>,
    transport: Option<String>,
    url: Option<String>,
    disabled: bool,
}

impl McpServersConfig {
    /// Read and parse a config file
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::from_io(path, e))?;
        Self::parse(&content).map_err(|e| match e {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    /// Parse config text
    pub fn parse(content: &str) -> ConfigResult<Self> {
        let raw: RawFile = serde_json::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            message: e.to_string(),
        })?;

        let servers = raw
            .mcp_servers
            .into_iter()
            .map(|(name, value)| {
                let entry: RawEntry = serde_json::from_value(value).map_err(|e| {
                    ConfigError::Invalid(format!("server `{}`: {}", name, e))
                })?;
                server_from_raw(name, entry)
            })
            .collect::<ConfigResult<Vec<_>>>()?;

        Ok(Self { servers })
    }

    /// Servers that are not disabled
    pub fn enabled(&self) -> impl Iterator<Item = &ServerConfig> {
        self.servers.iter().filter(|s| !s.disabled)
    }
}

fn server_from_raw(name: String, entry: RawEntry) -> ConfigResult<ServerConfig> {
    let transport = match entry.transport.as_deref().map(str::to_lowercase).as_deref() {
        Some("http") | Some("streamable-http") | Some("streamable_http") => {
            let url = entry
                .url
                .filter(|u| !u.trim().is_empty())
                .ok_or_else(|| ConfigError::Invalid(format!("server `{}`: http transport needs a url", name)))?;
            ServerTransport::Http { url }
        }
        Some("stdio") | None => match entry.command.filter(|c| !c.trim().is_empty()) {
            Some(command) => {
                let mut env: Vec<(String, String)> = entry
                    .env
                    .into_iter()
                    .map(|(k, v)| {
                        let v = expand_env_placeholders(&v);
                        (k, v)
                    })
                    .collect();
                env.sort();
                ServerTransport::Stdio {
                    command,
                    args: entry.args,
                    cwd: entry.cwd,
                    env,
                }
            }
            None => match entry.url {
                Some(url) if entry.transport.is_none() => ServerTransport::Http { url },
                _ => {
                    return Err(ConfigError::Invalid(format!(
                        "server `{}`: needs either `command` or `transport: \"http\"` with `url`",
                        name
                    )))
                }
            },
        },
        Some("sse") => {
            return Err(ConfigError::Invalid(format!(
                "server `{}`: legacy SSE transport is not supported, use `transport: \"http\"` (Streamable HTTP)",
                name
            )))
        }
        Some(other) => {
            return Err(ConfigError::Invalid(format!(
                "server `{}`: unknown transport `{}`",
                name, other
            )))
        }
    };

    Ok(ServerConfig {
        name,
        disabled: entry.disabled,
        transport,
    })
}

/// Replace `${NAME}` with the value of environment variable `NAME`
///
/// Unset variables are left as written.
pub fn expand_env_placeholders(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let key = &after[..end];
                match std::env::var(key) {
                    Ok(value) => out.push_str(&value),
                    Err(_) => out.push_str(&rest[start..start + 2 + end + 1]),
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"{
        "mcpServers": {
            "zeta-time": { "command": "uvx", "args": ["mcp-server-time"], "cwd": "/tmp" },
            "alpha-search": { "transport": "http", "url": "https://example.com/mcp" },
            "old": { "transport": "http", "url": "http://localhost:9000/mcp", "disabled": true }
        }
    }"#;

    #[test]
    fn test_parse_keeps_file_order() {
        let config = McpServersConfig::parse(SAMPLE).unwrap();
        let names: Vec<_> = config.servers.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["zeta-time", "alpha-search", "old"]);

        assert_eq!(
            config.servers[0].transport,
            ServerTransport::Stdio {
                command: "uvx".into(),
                args: vec!["mcp-server-time".into()],
                cwd: Some(PathBuf::from("/tmp")),
                env: vec![],
            }
        );
        assert_eq!(config.servers[1].transport.kind(), "http");
    }

    #[test]
    fn test_disabled_entries_are_skipped() {
        let config = McpServersConfig::parse(SAMPLE).unwrap();
        let enabled: Vec<_> = config.enabled().map(|s| s.name.as_str()).collect();
        assert_eq!(enabled, vec!["zeta-time", "alpha-search"]);
    }

    #[test]
    fn test_invalid_entries() {
        let err = McpServersConfig::parse(r#"{"mcpServers": {"x": {"transport": "http"}}}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = McpServersConfig::parse(r#"{"mcpServers": {"x": {"args": ["a"]}}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = McpServersConfig::parse(r#"{"mcpServers": {"x": {"transport": "carrier-pigeon"}}}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_sse_transport_is_rejected_with_hint() {
        let err = McpServersConfig::parse(
            r#"{"mcpServers": {"old": {"transport": "sse", "url": "http://localhost:8000/sse"}}}"#,
        )
        .unwrap_err();
        match err {
            ConfigError::Invalid(message) => assert!(message.contains("Streamable HTTP")),
            other => panic!("unexpected error: {:?}", other),
        }

        let config = McpServersConfig::parse(
            r#"{"mcpServers": {"new": {"transport": "streamable-http", "url": "http://localhost:8000/mcp"}}}"#,
        )
        .unwrap();
        assert_eq!(config.servers[0].transport.kind(), "http");
    }

    #[test]
    fn test_malformed_and_missing_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mcp_config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            McpServersConfig::load(&path),
            Err(ConfigError::Parse { path: p, .. }) if p == path
        ));

        let missing = dir.path().join("nope.json");
        assert!(matches!(
            McpServersConfig::load(&missing),
            Err(ConfigError::NotFound { .. })
        ));
    }

    #[test]
    fn test_empty_config() {
        let config = McpServersConfig::parse("{}").unwrap();
        assert!(config.servers.is_empty());
    }

    #[test]
    fn test_expand_env_placeholders() {
        let path = std::env::var("PATH").unwrap_or_default();
        assert_eq!(expand_env_placeholders("${PATH}"), path);
        assert_eq!(
            expand_env_placeholders("key=${ASKIT_SURELY_UNSET_VAR}"),
            "key=${ASKIT_SURELY_UNSET_VAR}"
        );
        assert_eq!(expand_env_placeholders("open ${brace"), "open ${brace");
    }
}
