//! YAML settings file
//!
//! Lives at `~/.config/askit/config.yaml` by default (the platform config
//! directory on macOS and Windows).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::{ConfigError, ConfigResult};

/// Contents of the settings file; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSettings {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub system_prompt: Option<String>,
    pub max_tool_calls: Option<usize>,
    pub mcp_config: Option<PathBuf>,
}

/// Location of a settings file
#[derive(Debug, Clone)]
pub struct SettingsFile {
    path: PathBuf,
}

impl SettingsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// User-level settings file
    pub fn user() -> Self {
        let config_dir = dirs::config_dir().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config")
        });
        Self::new(config_dir.join("askit").join("config.yaml"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the file; a missing file yields empty settings
    pub fn load(&self) -> ConfigResult<FileSettings> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(FileSettings::default()),
            Err(e) => return Err(ConfigError::from_io(&self.path, e)),
        };

        if content.trim().is_empty() {
            return Ok(FileSettings::default());
        }

        serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    /// Write settings, creating parent directories
    pub fn save(&self, settings: &FileSettings) -> ConfigResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::from_io(parent, e))?;
        }
        let content = serde_yaml::to_string(settings).map_err(|e| ConfigError::Parse {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        fs::write(&self.path, content).map_err(|e| ConfigError::from_io(&self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let file = SettingsFile::new(dir.path().join("config.yaml"));
        assert!(!file.exists());
        assert_eq!(file.load().unwrap(), FileSettings::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let file = SettingsFile::new(dir.path().join("nested").join("config.yaml"));
        let settings = FileSettings {
            provider: Some("anthropic".into()),
            max_tool_calls: Some(5),
            ..Default::default()
        };
        file.save(&settings).unwrap();

        let content = fs::read_to_string(file.path()).unwrap();
        assert!(content.contains("anthropic"));
        assert_eq!(file.load().unwrap(), settings);
    }

    #[test]
    fn test_malformed_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "max_tool_calls: [not, a, number").unwrap();
        let err = SettingsFile::new(&path).load().unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
