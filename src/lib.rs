//! Map function execution for document view indexes.
//!
//! A map function is a user-supplied JavaScript function of one argument
//! that is run once per JSON document and calls `emit(key, value)` zero or
//! more times. This crate compiles the function once, runs it against
//! documents from any number of threads, and returns the emitted pairs as
//! [`ViewRow`]s in emit order. Storing, sorting and reducing the rows is
//! left to the caller.
//!
//! # Quick Start
//!
//! ```ignore
//! use view_map::prelude::*;
//!
//! let mapper = JsMapFunction::new(r#"function(doc) { emit(doc.key, doc.value); }"#)?;
//! let rows = mapper.call_function(r#"{"key": "k", "value": "v"}"#, "doc1")?;
//! assert_eq!(rows, vec![ViewRow::new("k", "v").with_id("doc1")]);
//! mapper.stop();
//! ```
//!
//! # Modules
//!
//! - [`value`] - JSON values with uniform floating-point numbers
//! - [`map`] - backend-independent engine, context pool and row types
//! - [`quickjs`] - QuickJS execution backend (requires `quickjs` feature)
//! - [`config`] - engine configuration
//!
//! # Feature Flags
//!
//! - `quickjs` - QuickJS backend (enabled by default)
//! - `logging` - library-level tracing (consumers provide their own subscriber)
//! - `cli` - the `view-map` command-line indexer
//! - `full` - all of the above

pub mod config;
pub mod error;
#[macro_use]
pub(crate) mod logging;
pub mod map;
pub mod prelude;
#[cfg(feature = "quickjs")]
pub mod quickjs;
pub mod value;

pub use config::{ConfigError, EngineConfig};
pub use error::{Error, Result};
pub use map::{MapContext, MapError, MapFunction, MapRuntime, PoolStats, ViewRow};
pub use value::Value;

#[cfg(feature = "quickjs")]
pub use quickjs::{JsMapFunction, QuickJsRuntime};
