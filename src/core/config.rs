//! Optional user configuration.
//!
//! Read from `teller.toml` under the platform config directory. Everything
//! has a sensible default, so a missing file is not an error; a present but
//! unparsable file is, since silently ignoring an explicit config would be
//! worse than stopping.

use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the banking assistant backend.
    pub endpoint: Option<String>,
    /// User identifier sent with every chat request.
    pub user_id: Option<String>,
}

/// Errors that can occur when loading configuration from disk.
#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "Failed to read config at {}: {}", path.display(), source)
            }
            ConfigError::Parse { path, source } => {
                write!(f, "Failed to parse config at {}: {}", path.display(), source)
            }
        }
    }
}

impl StdError for ConfigError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
        }
    }
}

impl Config {
    pub fn load() -> Result<Config, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Config::default()),
        }
    }

    pub fn load_from_path(path: &PathBuf) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }
}

fn config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "teller").map(|dirs| dirs.config_dir().join("teller.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("teller.toml");
        let config = Config::load_from_path(&path).unwrap();
        assert!(config.endpoint.is_none());
        assert_eq!(config.endpoint(), DEFAULT_ENDPOINT);
    }

    #[test]
    fn present_file_overrides_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("teller.toml");
        fs::write(&path, "endpoint = \"http://bank.internal:8000\"\n").unwrap();
        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.endpoint(), "http://bank.internal:8000");
        assert!(config.user_id.is_none());
    }

    #[test]
    fn unparsable_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("teller.toml");
        fs::write(&path, "endpoint = [broken").unwrap();
        assert!(Config::load_from_path(&path).is_err());
    }
}
