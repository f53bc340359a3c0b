//! Application Configuration
//!
//! Manages workbench settings:
//! - Highlighter timing
//! - Interpreter and script location
//! - Output panel behaviour

use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Deserialize, Serialize};
use directories::ProjectDirs;
use tracing::{info, debug};

use crate::error::Result;

/// Editor configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EditorConfig {
    /// Quiet period after the last edit before keywords are re-highlighted
    pub highlight_delay_ms: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            highlight_delay_ms: 100,
        }
    }
}

impl EditorConfig {
    pub fn highlight_delay(&self) -> Duration {
        Duration::from_millis(self.highlight_delay_ms)
    }
}

/// Script runner configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RunnerConfig {
    /// Interpreter executable, either a bare name looked up on PATH or a path
    pub interpreter: String,
    /// File name the script is written to before each run
    pub script_file_name: String,
    /// Directory for the script file (system temp dir when unset)
    pub script_dir: Option<PathBuf>,
    /// How long to wait for a killed process to exit
    pub kill_timeout_ms: u64,
    /// How long output readers may keep draining after the process exited
    pub drain_timeout_ms: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            interpreter: "swift".to_string(),
            script_file_name: "script.swift".to_string(),
            script_dir: None,
            kill_timeout_ms: 2000,
            drain_timeout_ms: 500,
        }
    }
}

impl RunnerConfig {
    /// Full path the script is persisted to
    pub fn script_path(&self) -> PathBuf {
        self.script_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
            .join(&self.script_file_name)
    }

    pub fn kill_timeout(&self) -> Duration {
        Duration::from_millis(self.kill_timeout_ms)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }
}

/// Output panel configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OutputConfig {
    /// Clear the output log at the start of every run
    pub auto_clear: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { auto_clear: true }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration version for migrations
    pub version: u32,
    /// Editor settings
    pub editor: EditorConfig,
    /// Runner settings
    pub runner: RunnerConfig,
    /// Output settings
    pub output: OutputConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: 1,
            editor: EditorConfig::default(),
            runner: RunnerConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl AppConfig {
    /// Get the configuration directory path
    pub fn config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "scriptbench", "Script Bench")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the configuration file path
    pub fn config_file() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Load configuration from the default location, writing defaults if missing
    pub async fn load() -> Result<Self> {
        let config_file = Self::config_file()
            .ok_or_else(|| crate::error::WorkbenchError::Config("Cannot determine config path".into()))?;
        Self::load_from(&config_file).await
    }

    /// Load configuration from a specific file, writing defaults if missing
    pub async fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            debug!("Loading config from {:?}", path);
            let contents = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&contents)?;
            Ok(config)
        } else {
            info!("Config file not found, using defaults");
            let config = AppConfig::default();
            config.save_to(path).await?;
            Ok(config)
        }
    }

    /// Save configuration to the default location
    pub async fn save(&self) -> Result<()> {
        let config_file = Self::config_file()
            .ok_or_else(|| crate::error::WorkbenchError::Config("Cannot determine config path".into()))?;
        self.save_to(&config_file).await
    }

    /// Save configuration to a specific file
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let contents = self.to_toml()?;
        tokio::fs::write(path, contents).await?;

        debug!("Config saved to {:?}", path);
        Ok(())
    }

    /// Render as pretty TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.editor.highlight_delay(), Duration::from_millis(100));
        assert_eq!(config.runner.interpreter, "swift");
        assert!(config.output.auto_clear);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str("[runner]\ninterpreter = \"python3\"\n").unwrap();
        assert_eq!(config.runner.interpreter, "python3");
        assert_eq!(config.runner.script_file_name, "script.swift");
        assert_eq!(config.editor.highlight_delay_ms, 100);
    }

    #[test]
    fn test_script_path() {
        let mut runner = RunnerConfig::default();
        runner.script_dir = Some(PathBuf::from("/work"));
        assert_eq!(runner.script_path(), PathBuf::from("/work/script.swift"));
    }

    #[tokio::test]
    async fn test_load_creates_defaults_then_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let created = AppConfig::load_from(&path).await.unwrap();
        assert_eq!(created, AppConfig::default());
        assert!(path.exists());

        let mut changed = created.clone();
        changed.output.auto_clear = false;
        changed.runner.kill_timeout_ms = 50;
        changed.save_to(&path).await.unwrap();

        let loaded = AppConfig::load_from(&path).await.unwrap();
        assert_eq!(loaded, changed);
    }
}
