//! Caller-facing map function engine.

use crate::config::EngineConfig;
use crate::logging::{debug, info, warn};
use crate::value::Value;

use super::error::MapError;
use super::pool::{ContextPool, PoolStats};
use super::row::ViewRow;
use super::runtime::MapRuntime;

/// A compiled map function backed by a pool of execution contexts.
///
/// The engine is `Sync` when its contexts are `Send`: share it behind an
/// `Arc` and call [`call_function`](Self::call_function) from as many
/// threads as needed. At most `pool_size` calls run at once; the rest wait
/// for a free context.
pub struct MapFunction<R: MapRuntime> {
    source: String,
    backend: &'static str,
    pool: ContextPool<R::Context>,
}

impl<R: MapRuntime> MapFunction<R> {
    /// Compile `source` into `config.pool_size` execution contexts.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Compile`] if the source is not a one-parameter
    /// function literal, or [`MapError::Init`] if an interpreter cannot be
    /// started.
    pub fn compile(runtime: &R, source: &str, config: &EngineConfig) -> Result<Self, MapError> {
        let pool_size = config.effective_pool_size();
        debug!(backend = runtime.name(), pool_size, "compiling map function");

        let mut contexts = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            let context = runtime.create_context(source, config).map_err(|e| {
                warn!(error = %e, "map function rejected");
                e
            })?;
            contexts.push(context);
        }

        info!(backend = runtime.name(), pool_size, "map function compiled");

        Ok(Self {
            source: source.to_string(),
            backend: runtime.name(),
            pool: ContextPool::new(contexts),
        })
    }

    /// Run the map function over a JSON document without tagging rows.
    ///
    /// Every returned row has `id == None`. The identifier is only used for
    /// diagnostics.
    #[cfg_attr(not(feature = "logging"), allow(unused_variables))]
    pub(crate) fn call_mapper(
        &self,
        document: &str,
        identifier: &str,
    ) -> Result<Vec<ViewRow>, MapError> {
        if self.pool.is_stopped() {
            return Err(MapError::EngineStopped);
        }
        let document = Value::from_json_str(document).map_err(|e| {
            debug!(id = identifier, error = %e, "document is not valid JSON");
            e
        })?;
        self.map_value(&document, identifier)
    }

    #[cfg_attr(not(feature = "logging"), allow(unused_variables))]
    fn map_value(&self, document: &Value, identifier: &str) -> Result<Vec<ViewRow>, MapError> {
        let mut context = self.pool.acquire()?;
        match context.map_document(document) {
            Ok(rows) => {
                debug!(id = identifier, rows = rows.len(), "map call completed");
                Ok(rows)
            }
            Err(e) => {
                warn!(id = identifier, error = %e, "map call failed");
                Err(e)
            }
        }
    }

    /// Run the map function over a JSON document.
    ///
    /// Rows come back in emit order, each tagged with `identifier`.
    ///
    /// # Errors
    ///
    /// - [`MapError::InvalidDocument`] if `document` is not valid JSON
    /// - [`MapError::MapFunction`] if the function throws
    /// - [`MapError::EngineStopped`] after [`stop`](Self::stop)
    pub fn call_function(
        &self,
        document: &str,
        identifier: &str,
    ) -> Result<Vec<ViewRow>, MapError> {
        let rows = self.call_mapper(document, identifier)?;
        Ok(tag_rows(rows, identifier))
    }

    /// Like [`call_function`](Self::call_function) for an already parsed
    /// document.
    pub fn call_document(
        &self,
        document: &Value,
        identifier: &str,
    ) -> Result<Vec<ViewRow>, MapError> {
        let rows = self.map_value(document, identifier)?;
        Ok(tag_rows(rows, identifier))
    }

    /// Release every interpreter. Later calls fail with
    /// [`MapError::EngineStopped`]; calling `stop` again is a no-op.
    ///
    /// Must not be called while calls are in flight.
    pub fn stop(&self) {
        if self.pool.stop() {
            info!(backend = self.backend, "map function stopped");
        }
    }

    /// Whether [`stop`](Self::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        self.pool.is_stopped()
    }

    /// The function source this engine was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Pool usage counters.
    pub fn stats(&self) -> PoolStats {
        self.pool.stats()
    }
}

fn tag_rows(mut rows: Vec<ViewRow>, identifier: &str) -> Vec<ViewRow> {
    for row in &mut rows {
        row.id = Some(identifier.to_string());
    }
    rows
}

impl<R: MapRuntime> std::fmt::Debug for MapFunction<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapFunction")
            .field("backend", &self.backend)
            .field("source", &self.source)
            .field("stats", &self.pool.stats())
            .finish()
    }
}
