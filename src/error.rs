//! Unified error type for the view-map library.
//!
//! Module errors ([`MapError`], [`ConfigError`]) convert into [`Error`] with
//! `?`, so applications can use a single result type.

use thiserror::Error;

use crate::config::ConfigError;
use crate::map::MapError;

/// Unified error type for all view-map operations.
///
/// # Example
///
/// ```ignore
/// use view_map::{EngineConfig, JsMapFunction, Result};
///
/// fn index(source: &str) -> Result<usize> {
///     let config = EngineConfig::from_file("view-map.toml")?;
///     let mapper = JsMapFunction::with_config(source, &config)?;
///     Ok(mapper.call_function("{}", "doc1")?.len())
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// Map function compilation or execution error.
    #[error(transparent)]
    Map(#[from] MapError),

    /// Configuration loading error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A [`Result`] type alias using the unified [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns `true` if this is a map function error.
    pub fn is_map(&self) -> bool {
        matches!(self, Self::Map(_))
    }

    /// Returns `true` if the error only affects one document.
    pub fn is_document_error(&self) -> bool {
        matches!(self, Self::Map(e) if e.is_document_error())
    }

    /// Returns `true` if this is a configuration error.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns `true` if this is an I/O error.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
