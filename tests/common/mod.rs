//! Common test utilities and fixtures.
//!
//! Shared map function sources and helpers for the integration tests.

#![cfg(feature = "quickjs")]
#![allow(dead_code)]

use view_map::{EngineConfig, JsMapFunction, Value, ViewRow};

// =============================================================================
// Map Function Sources
// =============================================================================

/// Emits the document's `key` and `value` fields.
pub const KEY_VALUE_MAP: &str = "function(doc) {emit(doc.key, doc.value);}";

/// Emits one row per tag, keyed by `[tag, doc.n]`.
pub const TAGS_MAP: &str = r#"
function(doc) {
    if (!doc.tags) return;
    for (var i = 0; i < doc.tags.length; i++) {
        emit([doc.tags[i], doc.n], null);
    }
}
"#;

/// Throws for documents with `fail: true`, after emitting one row.
pub const FAILING_MAP: &str = r#"
function(doc) {
    emit("before", doc.n);
    if (doc.fail) throw new TypeError("refusing " + doc.n);
    emit("after", doc.n);
}
"#;

/// Emits the document's `n` field many times, giving other threads a chance
/// to interleave if buffers were shared.
pub const REPEAT_MAP: &str = r#"
function(doc) {
    for (var i = 0; i < 25; i++) emit(doc.n, i);
}
"#;

// =============================================================================
// Helpers
// =============================================================================

/// Compile `source` with a pool of `pool_size` contexts.
pub fn mapper_with_pool(source: &str, pool_size: usize) -> anyhow::Result<JsMapFunction> {
    let config = EngineConfig::default().with_pool_size(pool_size);
    Ok(JsMapFunction::with_config(source, &config)?)
}

/// Parse a JSON literal into a [`Value`].
pub fn json(text: &str) -> Value {
    Value::from_json_str(text).unwrap_or_else(|e| panic!("bad JSON fixture {text}: {e}"))
}

/// Build the row `{id, key, value}` from JSON literals.
pub fn row(id: &str, key: &str, value: &str) -> ViewRow {
    ViewRow::new(json(key), json(value)).with_id(id)
}
