//! Backend capability traits.
//!
//! The pool and the row builder only need two things from an embedded
//! interpreter: turn a function source into a ready execution context, and
//! run that context against one document. Any interpreter implementing
//! [`MapRuntime`] can back a [`MapFunction`](super::MapFunction).

use crate::config::EngineConfig;
use crate::value::Value;

use super::error::MapError;
use super::row::ViewRow;

/// Factory for execution contexts with a compiled map function bound in.
pub trait MapRuntime {
    /// The execution context type produced by this runtime.
    type Context: MapContext;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Start an interpreter, compile `source` into it and install `emit`.
    ///
    /// Fails with [`MapError::Compile`] if the source is not a valid
    /// one-parameter function, or [`MapError::Init`] if the interpreter
    /// cannot be started.
    fn create_context(&self, source: &str, config: &EngineConfig)
    -> Result<Self::Context, MapError>;
}

/// One interpreter instance holding a compiled map function.
///
/// A context is used by one call at a time, so its emit buffer never sees
/// rows from another document.
pub trait MapContext: Send {
    /// Run the map function over a parsed document.
    ///
    /// Returns the emitted rows in emit order, all with `id` unset. A
    /// script-level exception is reported as [`MapError::MapFunction`] and
    /// leaves the context ready for the next document.
    fn map_document(&mut self, document: &Value) -> Result<Vec<ViewRow>, MapError>;
}
