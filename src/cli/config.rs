//! Command-line configuration file.
//!
//! ```toml
//! [engine]
//! pool_size = 4
//! timeout_ms = 500
//!
//! [logging]
//! level = "info,view_map=debug"
//! format = "json"
//! output = "stderr"
//! ```

use std::path::Path;

use serde::Deserialize;
use view_map::{ConfigError, EngineConfig};

/// Top-level configuration for the `view-map` binary.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub engine: EngineConfig,
    pub logging: LoggingConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. "info" or "warn,view_map=debug".
    pub level: String,
    pub format: LogFormat,
    /// "stdout", "stderr", or a file path.
    pub output: String,
    pub timestamps: bool,
    /// ANSI colors, only applied when the output is a terminal.
    pub color: bool,
    /// Include the event target (module path).
    pub target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Text,
            // stdout carries the emitted rows.
            output: "stderr".to_string(),
            timestamps: true,
            color: true,
            target: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl CliConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.display().to_string(), e))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}
