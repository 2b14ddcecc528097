//! Engine configuration.
//!
//! ```toml
//! pool_size = 4
//! memory_limit_mb = 64
//! max_stack_size_kb = 512
//! timeout_ms = 250
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Resource limits and pool sizing for a map engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of execution contexts. Values below 1 are treated as 1.
    pub pool_size: usize,

    /// Heap limit per context in megabytes. 0 disables the limit.
    pub memory_limit_mb: usize,

    /// Stack limit per context in kilobytes. 0 keeps the interpreter default.
    pub max_stack_size_kb: usize,

    /// Abort a single map call after this many milliseconds.
    pub timeout_ms: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pool_size: 1,
            memory_limit_mb: 64,
            max_stack_size_kb: 512,
            timeout_ms: None,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.display().to_string(), e))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Set the number of execution contexts.
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Set the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// The pool size actually used.
    pub fn effective_pool_size(&self) -> usize {
        self.pool_size.max(1)
    }

    pub fn memory_limit_bytes(&self) -> Option<usize> {
        (self.memory_limit_mb > 0).then(|| self.memory_limit_mb.saturating_mul(1024 * 1024))
    }

    pub fn max_stack_size_bytes(&self) -> Option<usize> {
        (self.max_stack_size_kb > 0).then(|| self.max_stack_size_kb.saturating_mul(1024))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Configuration loading error.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{0}': {1}")]
    Io(String, #[source] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}
