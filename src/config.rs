//! Tool configuration, loaded from `~/.config/claude-sync/config.toml`.
//!
//! ```toml
//! default_remote = "user@desktop.local"
//! connect_timeout_secs = 10
//! # claude_dir = "/custom/claude"
//! ```
//!
//! A missing file yields defaults; a malformed one is fatal.

use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote used by `push`/`pull`/`list` when no positional remote is given.
    pub default_remote: Option<String>,
    /// SSH ConnectTimeout in seconds.
    pub connect_timeout_secs: u64,
    /// Session store location; the `--claude-dir` flag and env override this.
    pub claude_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_remote: None,
            connect_timeout_secs: 10,
            claude_dir: None,
        }
    }
}

impl Config {
    /// Load from the default config path, or defaults if it doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load from an explicit path; missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn config_path() -> Option<PathBuf> {
        Some(dirs::config_dir()?.join("claude-sync").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn missing_file_yields_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = Config::load_from(&tmp.path().join("config.toml")).unwrap();
        assert!(config.default_remote.is_none());
        assert_eq!(config.connect_timeout_secs, 10);
        assert!(config.claude_dir.is_none());
    }

    #[test]
    fn parses_fields_and_fills_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "default_remote = \"user@host\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.default_remote.as_deref(), Some("user@host"));
        assert_eq!(config.connect_timeout_secs, 10);
    }

    #[test]
    fn malformed_toml_is_fatal() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "default_remote = [broken").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.toml"));
    }
}
