//! sqconsole configuration
//!
//! A single user-level TOML file. Every field has a default, so a partial or
//! missing file is fine.
//!
//! ```text
//! $XDG_CONFIG_HOME/sqconsole/config.toml
//! ~/.config/sqconsole/config.toml          (fallback)
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use sqconsole::util::config::load_config;
//!
//! let config = load_config().unwrap();
//! println!("prompt: {}", config.repl.prompt);
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::console::PromptStyle;
use crate::vm::VmConfig;

/// User-level configuration for sqconsole
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ConsoleConfig {
    /// Interactive console settings
    #[serde(default)]
    pub repl: ReplSection,
    /// Script engine settings
    #[serde(default)]
    pub vm: VmSection,
}

/// REPL configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplSection {
    /// Leading prompt text
    #[serde(default = "default_prompt")]
    pub prompt: String,
    /// Appended once per open brace block
    #[serde(default = "default_depth_marker")]
    pub depth_marker: String,
    /// Appended while inside an unterminated string
    #[serde(default = "default_string_marker")]
    pub string_marker: String,
    /// History file path
    #[serde(default)]
    pub history_file: Option<PathBuf>,
    /// History size
    #[serde(default = "default_history_size")]
    pub history_size: usize,
    /// Highlight error output
    #[serde(default = "default_colors")]
    pub colors: bool,
}

fn default_prompt() -> String {
    ">".to_string()
}

fn default_depth_marker() -> String {
    ">".to_string()
}

fn default_string_marker() -> String {
    "...".to_string()
}

fn default_history_size() -> usize {
    1000
}

fn default_colors() -> bool {
    true
}

impl Default for ReplSection {
    fn default() -> Self {
        Self {
            prompt: default_prompt(),
            depth_marker: default_depth_marker(),
            string_marker: default_string_marker(),
            history_file: None,
            history_size: default_history_size(),
            colors: default_colors(),
        }
    }
}

impl ReplSection {
    pub fn prompt_style(&self) -> PromptStyle {
        PromptStyle {
            prompt: self.prompt.clone(),
            depth_marker: self.depth_marker.clone(),
            string_marker: self.string_marker.clone(),
        }
    }

    /// Configured history file, else `history` next to the config file
    pub fn resolved_history_file(&self) -> Option<PathBuf> {
        self.history_file
            .clone()
            .or_else(|| get_config_dir().map(|dir| dir.join("history")))
    }
}

/// VM configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VmSection {
    #[serde(default = "default_initial_stack_size")]
    pub initial_stack_size: usize,
    #[serde(default = "default_max_call_depth")]
    pub max_call_depth: usize,
}

fn default_initial_stack_size() -> usize {
    VmConfig::default().initial_stack_size
}

fn default_max_call_depth() -> usize {
    VmConfig::default().max_call_depth
}

impl Default for VmSection {
    fn default() -> Self {
        Self {
            initial_stack_size: default_initial_stack_size(),
            max_call_depth: default_max_call_depth(),
        }
    }
}

impl VmSection {
    pub fn to_vm_config(&self) -> VmConfig {
        VmConfig {
            initial_stack_size: self.initial_stack_size,
            max_call_depth: self.max_call_depth,
        }
    }
}

/// Get the user config directory
pub fn get_config_dir() -> Option<PathBuf> {
    // Try XDG config directory on Unix
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config).join("sqconsole"));
    }

    // Fallback to ~/.config/sqconsole
    if let Ok(home) = std::env::var("HOME") {
        return Some(PathBuf::from(home).join(".config").join("sqconsole"));
    }

    // On Windows, try %APPDATA%
    if let Ok(appdata) = std::env::var("APPDATA") {
        return Some(PathBuf::from(appdata).join("sqconsole"));
    }

    None
}

/// Get the user config file path (~/.config/sqconsole/config.toml)
pub fn get_config_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join("config.toml"))
}

/// Load the user-level configuration.
/// Returns the default config if the file doesn't exist.
pub fn load_config() -> Result<ConsoleConfig, ConfigError> {
    match get_config_path() {
        Some(path) => load_config_from(&path),
        None => Ok(ConsoleConfig::default()),
    }
}

/// Load configuration from an explicit path; a missing file yields defaults
pub fn load_config_from(path: &Path) -> Result<ConsoleConfig, ConfigError> {
    if !path.exists() {
        return Ok(ConsoleConfig::default());
    }

    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Save the user-level configuration
pub fn save_config(config: &ConsoleConfig) -> Result<(), ConfigError> {
    let path = get_config_path().ok_or(ConfigError::NoConfigDir)?;
    save_config_to(config, &path)
}

/// Save configuration to `path`, creating its directory if needed
pub fn save_config_to(
    config: &ConsoleConfig,
    path: &Path,
) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            fs::create_dir_all(dir)?;
        }
    }

    let content = toml::to_string_pretty(config)?;
    fs::write(path, content)?;

    Ok(())
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Cannot determine config directory")]
    NoConfigDir,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ConsoleConfig::default();
        assert_eq!(config.repl.prompt, ">");
        assert_eq!(config.repl.history_size, 1000);
        assert!(config.repl.colors);
        assert_eq!(config.vm.to_vm_config(), VmConfig::default());
        assert_eq!(config.repl.prompt_style(), PromptStyle::default());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, ConsoleConfig::default());
    }

    #[test]
    fn test_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[repl]\nprompt = \"sq\"\n\n[vm]\nmax_call_depth = 8\n").unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.repl.prompt, "sq");
        assert_eq!(config.repl.depth_marker, ">");
        assert_eq!(config.vm.max_call_depth, 8);
        assert_eq!(config.vm.initial_stack_size, 1024);
    }

    #[test]
    fn test_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[repl\nprompt = ").unwrap();

        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().starts_with("Config parse error"));
    }

    #[test]
    fn test_save_creates_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = ConsoleConfig::default();
        config.repl.history_file = Some(PathBuf::from("/tmp/sq_history"));
        config.repl.colors = false;

        save_config_to(&config, &path).unwrap();
        assert_eq!(load_config_from(&path).unwrap(), config);
    }
}
