//! Backend-independent map function engine.
//!
//! A [`MapFunction`] compiles a function source once per execution context,
//! keeps the contexts in a [`ContextPool`] and turns each document call into
//! an ordered list of [`ViewRow`]s. Interpreters plug in through the
//! [`MapRuntime`] and [`MapContext`] traits.

mod error;
mod function;
mod pool;
mod row;
mod runtime;

pub use error::MapError;
pub use function::MapFunction;
pub use pool::{ContextPool, PoolStats, PooledContext};
pub use row::ViewRow;
pub use runtime::{MapContext, MapRuntime};
