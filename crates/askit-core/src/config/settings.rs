//! Layered engine settings

use std::collections::HashMap;
use std::path::PathBuf;

use once_cell::sync::Lazy;

use super::error::{ConfigError, ConfigResult};
use super::file::{FileSettings, SettingsFile};

/// Rounds that may carry tool schemas before a final answer is forced
pub const DEFAULT_MAX_TOOL_CALLS: usize = 3;

/// System message used when neither the caller, the environment nor the
/// settings file supplies one
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant to another assistant. \
The other assistant does not have access to current information, but you do. \
You can help the other assistant by providing information that it can't access. \
You can provide information by calling a function that will get the information for you. \
The function will return the information to the other assistant. \
The other assistant will then use the information to help the user. \
If you don't know how to obtain the requested information simply state that you don't know \
how to help with that and nothing more. \
Please be direct and to the point when answering questions or executing commands.";

const DEFAULT_PROVIDER: &str = "openai";
const DEFAULT_MCP_CONFIG: &str = "mcp_config.json";

/// Model used when nothing else names one
static DEFAULT_MODELS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("openai", "gpt-4o-mini");
    m.insert("anthropic", "claude-3-5-haiku-latest");
    m.insert("gemini", "gemini-2.0-flash");
    m.insert("ollama", "llama3.2");
    m.insert("groq", "llama-3.3-70b-versatile");
    m.insert("xai", "grok-3-mini");
    m.insert("deepseek", "deepseek-chat");
    m.insert("cohere", "command-r-plus");
    m.insert("openrouter", "openai/gpt-4o-mini");
    m.insert("mistral", "mistral-small-latest");
    m.insert("mock", "mock-model");
    m
});

/// Default model for a provider id
pub fn default_model_for(provider: &str) -> &'static str {
    DEFAULT_MODELS
        .get(provider.to_lowercase().as_str())
        .copied()
        .unwrap_or("gpt-4o-mini")
}

/// Values the caller sets explicitly; these win over everything else
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub system_prompt: Option<String>,
    pub max_tool_calls: Option<usize>,
    pub mcp_config_path: Option<PathBuf>,
}

/// Resolved engine configuration
#[derive(Clone, PartialEq)]
pub struct EngineSettings {
    /// Provider id, lowercase (`openai`, `anthropic`, `ollama`, ...)
    pub provider: String,
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    /// Prepended as a system message when the transcript has none
    pub system_prompt: Option<String>,
    /// Round bound `R`
    pub max_tool_calls: usize,
    /// Used by `load_default_mcp_config`
    pub mcp_config_path: PathBuf,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            provider: DEFAULT_PROVIDER.to_string(),
            model: default_model_for(DEFAULT_PROVIDER).to_string(),
            api_key: None,
            base_url: None,
            system_prompt: Some(DEFAULT_SYSTEM_PROMPT.to_string()),
            max_tool_calls: DEFAULT_MAX_TOOL_CALLS,
            mcp_config_path: PathBuf::from(DEFAULT_MCP_CONFIG),
        }
    }
}

impl EngineSettings {
    /// Resolve against the process environment and the user settings file
    pub fn load(overrides: SettingsOverrides) -> ConfigResult<Self> {
        let file = SettingsFile::user().load()?;
        Self::resolve(overrides, |key| std::env::var(key).ok(), &file)
    }

    /// Resolve with explicit override > environment > file > default
    ///
    /// Provider-scoped variables (`OPENAI_API_KEY`, `OLLAMA_BASE_URL`, ...)
    /// rank just below their `ASKIT_*` counterparts.
    pub fn resolve<E>(overrides: SettingsOverrides, env: E, file: &FileSettings) -> ConfigResult<Self>
    where
        E: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let provider = overrides
            .provider
            .or_else(|| env("ASKIT_PROVIDER"))
            .or_else(|| file.provider.clone())
            .unwrap_or_else(|| DEFAULT_PROVIDER.to_string())
            .to_lowercase();
        let scope = provider.to_uppercase().replace('-', "_");
        let scoped = |suffix: &str| env(&format!("{}_{}", scope, suffix));

        let model = overrides
            .model
            .or_else(|| env("ASKIT_MODEL"))
            .or_else(|| scoped("MODEL"))
            .or_else(|| file.model.clone())
            .unwrap_or_else(|| default_model_for(&provider).to_string());

        let api_key = overrides
            .api_key
            .or_else(|| env("ASKIT_API_KEY"))
            .or_else(|| scoped("API_KEY"))
            .or_else(|| file.api_key.clone());

        let base_url = overrides
            .base_url
            .or_else(|| env("ASKIT_BASE_URL"))
            .or_else(|| scoped("BASE_URL"))
            .or_else(|| file.base_url.clone());

        let system_prompt = overrides
            .system_prompt
            .or_else(|| env("ASKIT_SYSTEM_PROMPT"))
            .or_else(|| file.system_prompt.clone())
            .or_else(|| Some(DEFAULT_SYSTEM_PROMPT.to_string()));

        let max_tool_calls = match overrides.max_tool_calls {
            Some(n) => n,
            None => match env("ASKIT_MAX_TOOL_CALLS") {
                Some(raw) => raw.trim().parse().map_err(|_| {
                    ConfigError::Invalid(format!(
                        "ASKIT_MAX_TOOL_CALLS must be a non-negative integer, got `{}`",
                        raw
                    ))
                })?,
                None => file.max_tool_calls.unwrap_or(DEFAULT_MAX_TOOL_CALLS),
            },
        };

        let mcp_config_path = overrides
            .mcp_config_path
            .or_else(|| env("ASKIT_MCP_CONFIG").map(PathBuf::from))
            .or_else(|| file.mcp_config.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MCP_CONFIG));

        Ok(Self {
            provider,
            model,
            api_key,
            base_url,
            system_prompt,
            max_tool_calls,
            mcp_config_path,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Send transcripts as given, with no system message added
    pub fn without_system_prompt(mut self) -> Self {
        self.system_prompt = None;
        self
    }

    pub fn with_max_tool_calls(mut self, max: usize) -> Self {
        self.max_tool_calls = max;
        self
    }
}

impl std::fmt::Debug for EngineSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineSettings")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("system_prompt", &self.system_prompt.is_some())
            .field("max_tool_calls", &self.max_tool_calls)
            .field("mcp_config_path", &self.mcp_config_path)
            .finish()
    }
}
