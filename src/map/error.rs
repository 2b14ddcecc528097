//! Error types for map function compilation and execution.

use thiserror::Error;

/// Errors that can occur while compiling or running a map function.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MapError {
    /// The source is not a single one-parameter function literal.
    #[error("Map function failed to compile: {0}")]
    Compile(String),

    /// The document text is not valid JSON.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// The map function threw while processing a document.
    #[error("Map function error: {0}")]
    MapFunction(String),

    /// A call was made after the engine was stopped.
    #[error("Map engine has been stopped")]
    EngineStopped,

    /// The interpreter could not be started.
    #[error("Interpreter initialization failed: {0}")]
    Init(String),
}

impl MapError {
    /// Whether the failure is confined to the document being processed.
    ///
    /// Per-document failures leave the engine usable; an index build can
    /// skip the document and continue.
    pub fn is_document_error(&self) -> bool {
        matches!(self, Self::InvalidDocument(_) | Self::MapFunction(_))
    }
}
