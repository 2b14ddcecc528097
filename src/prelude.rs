//! Convenient re-exports for common usage patterns.
//!
//! ```ignore
//! use view_map::prelude::*;
//!
//! let mapper = JsMapFunction::new("function(doc) { emit(doc._id, null); }")?;
//! let rows: Vec<ViewRow> = mapper.call_function(r#"{"_id": "a"}"#, "a")?;
//! ```

pub use crate::config::EngineConfig;
pub use crate::error::{Error, Result};
pub use crate::map::{MapContext, MapError, MapFunction, MapRuntime, PoolStats, ViewRow};
pub use crate::value::Value;

#[cfg(feature = "quickjs")]
pub use crate::quickjs::{JsMapFunction, QuickJsRuntime};
