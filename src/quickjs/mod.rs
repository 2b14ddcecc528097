//! QuickJS backend for map functions.
//!
//! Every execution context is a separate `rquickjs` runtime with its own
//! heap, memory limit and optional per-call timeout. The function source is
//! compiled once into each context when the engine is built.
//!
//! Scripts see two globals besides the standard library:
//!
//! - `emit(key, value)` - record one view row
//! - `console.log/warn/error` - logging (mapped to tracing)

mod compiler;
mod context;
mod convert;

pub use context::QuickJsContext;
pub use convert::MAX_DEPTH;

use crate::config::EngineConfig;
use crate::map::{MapError, MapFunction, MapRuntime};

/// The QuickJS interpreter as a [`MapRuntime`].
#[derive(Debug, Clone, Copy, Default)]
pub struct QuickJsRuntime;

impl MapRuntime for QuickJsRuntime {
    type Context = QuickJsContext;

    fn name(&self) -> &'static str {
        "quickjs"
    }

    fn create_context(
        &self,
        source: &str,
        config: &EngineConfig,
    ) -> Result<QuickJsContext, MapError> {
        QuickJsContext::new(source, config)
    }
}

/// A JavaScript map function running on QuickJS.
pub type JsMapFunction = MapFunction<QuickJsRuntime>;

impl MapFunction<QuickJsRuntime> {
    /// Compile a JavaScript map function with the default configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use view_map::JsMapFunction;
    ///
    /// let mapper = JsMapFunction::new(r#"function(doc) { emit(doc.type, 1); }"#)?;
    /// let rows = mapper.call_function(r#"{"type": "post"}"#, "doc1")?;
    /// assert_eq!(rows.len(), 1);
    /// assert_eq!(rows[0].id.as_deref(), Some("doc1"));
    /// mapper.stop();
    /// # Ok::<(), view_map::MapError>(())
    /// ```
    pub fn new(source: &str) -> Result<Self, MapError> {
        Self::with_config(source, &EngineConfig::default())
    }

    /// Compile a JavaScript map function with explicit limits and pool size.
    pub fn with_config(source: &str, config: &EngineConfig) -> Result<Self, MapError> {
        Self::compile(&QuickJsRuntime, source, config)
    }
}
