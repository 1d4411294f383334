//! Engine configuration
//!
//! Settings are layered: explicit overrides, then environment variables,
//! then the YAML settings file (`~/.config/askit/config.yaml`), then
//! built-in defaults.

mod error;
mod file;
mod settings;

pub use error::{ConfigError, ConfigResult};
pub use file::{FileSettings, SettingsFile};
pub use settings::{
    default_model_for, EngineSettings, SettingsOverrides, DEFAULT_MAX_TOOL_CALLS, DEFAULT_SYSTEM_PROMPT,
};
