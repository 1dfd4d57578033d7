//! Configuration model and loading for d3term.
//!
//! This module provides:
//! - The [`AppConfig`] value (startup + terminal sections) and its defaults
//! - [`normalize`], which turns an untrusted payload into a valid config
//! - Discovery and reading of `config.toml`
//!
//! # Configuration File
//!
//! The file lives at `$XDG_CONFIG_HOME/d3term/config.toml`
//! (or `~/.config/d3term/config.toml`):
//!
//! ```toml
//! [startup]
//! multiplexer = "tmux"          # none, tmux, zellij
//! shell = "/bin/zsh"
//! shell_args = ["-l"]
//! tmux_command = "tmux new-session -A -s main"
//!
//! [terminal]
//! theme = "system"              # system, dark, light
//! font_family = "GoMono Nerd Font Mono, monospace"
//! font_size = 14
//! line_height = 1.3
//! scrollback = 20000
//! ```
//!
//! Every value read from disk or received from the backend goes through
//! [`normalize`] before it reaches the terminal view.

mod font;
mod normalize;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use font::normalize_font_family;
pub use normalize::normalize;

/// Terminal multiplexer launched by the backend
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MultiplexerMode {
    None,
    Tmux,
    #[default]
    Zellij,
}

impl MultiplexerMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "none" => Some(Self::None),
            "tmux" => Some(Self::Tmux),
            "zellij" => Some(Self::Zellij),
            _ => None,
        }
    }
}

/// Color theme selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    /// Follow the system color-scheme preference
    #[default]
    System,
    Dark,
    Light,
}

impl ThemeMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "system" => Some(Self::System),
            "dark" => Some(Self::Dark),
            "light" => Some(Self::Light),
            _ => None,
        }
    }
}

/// How the backend starts the session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StartupConfig {
    pub multiplexer: MultiplexerMode,
    /// Shell program; `None` means the system default shell
    pub shell: Option<String>,
    pub shell_args: Vec<String>,
    /// Exact command line used when `multiplexer = "zellij"`
    pub zellij_command: String,
    /// Exact command line used when `multiplexer = "tmux"`
    pub tmux_command: String,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            multiplexer: MultiplexerMode::Zellij,
            shell: None,
            shell_args: Vec::new(),
            zellij_command: "zellij attach -c d3term".to_string(),
            tmux_command: "tmux new-session -A -s main".to_string(),
        }
    }
}

/// Display options of the terminal view
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TerminalConfig {
    pub theme: ThemeMode,
    /// CSS-style font stack, e.g. `'JetBrains Mono', Menlo, monospace`
    pub font_family: String,
    pub font_size: f64,
    pub letter_spacing: f64,
    pub line_height: f64,
    /// Lines kept above the viewport
    pub scrollback: u32,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            theme: ThemeMode::System,
            font_family: "'JetBrains Mono', Menlo, monospace".to_string(),
            font_size: 13.0,
            letter_spacing: 0.0,
            line_height: 1.2,
            scrollback: 10_000,
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    pub startup: StartupConfig,
    pub terminal: TerminalConfig,
}

/// The process-wide default configuration.
///
/// Immutable for the lifetime of the process; callers that need a mutable
/// "current" configuration clone it.
pub fn default_config() -> &'static AppConfig {
    static DEFAULT_CONFIG: OnceLock<AppConfig> = OnceLock::new();
    DEFAULT_CONFIG.get_or_init(AppConfig::default)
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Get config file path from the environment
pub fn resolve_config_path() -> PathBuf {
    let xdg = std::env::var("XDG_CONFIG_HOME").ok();
    let home = std::env::var("HOME").ok();
    resolve_config_path_with_env(xdg.as_deref(), home.as_deref())
}

/// Get config file path from explicit `XDG_CONFIG_HOME` / `HOME` values
pub fn resolve_config_path_with_env(xdg: Option<&str>, home: Option<&str>) -> PathBuf {
    if let Some(xdg_home) = xdg.map(str::trim).filter(|value| !value.is_empty()) {
        return PathBuf::from(xdg_home).join("d3term").join("config.toml");
    }

    if let Some(home_dir) = home.map(str::trim).filter(|value| !value.is_empty()) {
        return PathBuf::from(home_dir)
            .join(".config")
            .join("d3term")
            .join("config.toml");
    }

    PathBuf::from(".config").join("d3term").join("config.toml")
}

/// Read the config file as an untrusted JSON value.
///
/// A missing file yields `Value::Null`, which normalizes to the defaults.
pub fn read_raw_config(path: &Path) -> Result<serde_json::Value, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Ok(serde_json::Value::Null);
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    toml::from_str::<serde_json::Value>(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load and normalize the config file
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let raw = read_raw_config(path)?;
    Ok(normalize(&raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    fn temp_config(content: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, content).expect("Failed to write config");
        (dir, path)
    }

    #[test]
    fn test_resolve_path_uses_xdg_if_available() {
        let path = resolve_config_path_with_env(Some("/tmp/xdg"), Some("/tmp/home"));
        assert_eq!(path, PathBuf::from("/tmp/xdg/d3term/config.toml"));
    }

    #[test]
    fn test_resolve_path_falls_back_to_home() {
        let path = resolve_config_path_with_env(None, Some("/tmp/home"));
        assert_eq!(path, PathBuf::from("/tmp/home/.config/d3term/config.toml"));

        let path = resolve_config_path_with_env(Some("   "), Some("/tmp/home"));
        assert_eq!(path, PathBuf::from("/tmp/home/.config/d3term/config.toml"));
    }

    #[test]
    fn test_resolve_path_without_env_is_relative() {
        let path = resolve_config_path_with_env(None, None);
        assert_eq!(path, PathBuf::from(".config/d3term/config.toml"));
    }

    #[test]
    fn test_default_config_is_shared() {
        assert!(std::ptr::eq(default_config(), default_config()));
        assert_eq!(default_config(), &AppConfig::default());
        assert_eq!(default_config().startup.multiplexer, MultiplexerMode::Zellij);
        assert_eq!(default_config().terminal.scrollback, 10_000);
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("none").join("config.toml");
        let config = load_config(&path).expect("missing file is not an error");
        assert_eq!(&config, default_config());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let (_dir, path) = temp_config(
            r#"
                [startup]
                multiplexer = "tmux"

                [terminal]
                font_size = 15
                letter_spacing = -1
            "#,
        );

        let config = load_config(&path).expect("should load");
        assert_eq!(config.startup.multiplexer, MultiplexerMode::Tmux);
        assert_eq!(config.terminal.font_size, 15.0);
        assert_eq!(config.terminal.letter_spacing, -1.0);
        assert_eq!(config.terminal.line_height, 1.2);
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let (_dir, path) = temp_config("startup = [");
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_enums_serialize_lowercase() {
        let value = serde_json::to_value(default_config()).unwrap();
        assert_eq!(value["startup"]["multiplexer"], "zellij");
        assert_eq!(value["terminal"]["theme"], "system");
        assert!(value["startup"]["shell"].is_null());
    }
}
