//! Configuration loading from confine.toml.

use policy::Declarations;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Log filter used when `CONFINE_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Where `compile` writes profile files. Profiles go to stdout when unset.
    pub output_dir: Option<PathBuf>,

    /// Connection declarations (allow/deny).
    #[serde(flatten)]
    pub declarations: Declarations,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            output_dir: None,
            declarations: Declarations::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.declarations.check_rules()?;
        Ok(config)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error(transparent)]
    Declarations(#[from] policy::Error),
}
