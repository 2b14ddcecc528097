//! End-to-end tests for the JavaScript map function engine.

#![cfg(feature = "quickjs")]

mod common;

use common::{FAILING_MAP, KEY_VALUE_MAP, TAGS_MAP, json, row};
use view_map::{EngineConfig, Error, JsMapFunction, MapError, Value, ViewRow};

#[test]
fn test_call_function_sets_id() -> Result<(), anyhow::Error> {
    let mapper = JsMapFunction::new(KEY_VALUE_MAP)?;
    let rows = mapper.call_function(r#"{"key": "k", "value": "v"}"#, "doc1")?;
    assert_eq!(rows, vec![ViewRow::new("k", "v").with_id("doc1")]);
    mapper.stop();
    Ok(())
}

#[test]
fn test_rows_in_emit_order() -> Result<(), anyhow::Error> {
    let mapper = JsMapFunction::new(TAGS_MAP)?;
    let rows = mapper.call_function(r#"{"n": 3, "tags": ["b", "a", "b"]}"#, "post")?;
    assert_eq!(
        rows,
        vec![
            row("post", r#"["b", 3]"#, "null"),
            row("post", r#"["a", 3]"#, "null"),
            row("post", r#"["b", 3]"#, "null"),
        ]
    );

    assert!(mapper.call_function(r#"{"n": 1}"#, "untagged")?.is_empty());
    Ok(())
}

#[test]
fn test_numbers_are_floats() -> Result<(), anyhow::Error> {
    let mapper = JsMapFunction::new(KEY_VALUE_MAP)?;
    let rows = mapper.call_function(r#"{"key": 23, "value": {"a": [1, 2.5]}}"#, "d")?;
    let [only] = rows.as_slice() else {
        anyhow::bail!("expected one row, got {rows:?}");
    };
    assert_eq!(only.key, Value::Number(23.0));
    assert_eq!(only.value, json(r#"{"a": [1.0, 2.5]}"#));
    Ok(())
}

#[test]
fn test_empty_array_is_not_null() -> Result<(), anyhow::Error> {
    let mapper = JsMapFunction::new("function(doc) { emit([], doc.missing); }")?;
    let rows = mapper.call_function("{}", "d")?;
    assert_eq!(rows, vec![ViewRow::new(Value::Array(vec![]), Value::Null).with_id("d")]);
    Ok(())
}

#[test]
fn test_script_computed_values() -> Result<(), anyhow::Error> {
    let mapper = JsMapFunction::new(
        r#"function(doc) {
            emit(doc.title.toLowerCase(), {words: doc.title.split(" ").length});
            emit(Math.max.apply(null, doc.scores), doc.scores.length > 2);
        }"#,
    )?;
    let rows = mapper.call_function(r#"{"title": "Hello World", "scores": [3, 9, 4]}"#, "d")?;
    assert_eq!(
        rows,
        vec![
            row("d", r#""hello world""#, r#"{"words": 2}"#),
            row("d", "9", "true"),
        ]
    );
    Ok(())
}

#[test]
fn test_compile_errors() {
    for source in [
        "function(doc) {",
        "",
        "42",
        "function(doc, meta) { emit(doc, meta); }",
        "not javascript at all ###",
    ] {
        let err = JsMapFunction::new(source).unwrap_err();
        assert!(
            matches!(err, MapError::Compile(_)),
            "{source:?} gave {err:?}"
        );
    }
}

#[test]
fn test_invalid_document() -> Result<(), anyhow::Error> {
    let mapper = JsMapFunction::new(KEY_VALUE_MAP)?;
    for document in ["", "{", "{'single': 'quotes'}", "[1, 2,]"] {
        let err = mapper.call_function(document, "bad").unwrap_err();
        assert!(
            matches!(err, MapError::InvalidDocument(_)),
            "{document:?} gave {err:?}"
        );
    }
    // The engine is still usable.
    assert_eq!(mapper.call_function(r#"{"key": 1}"#, "ok")?.len(), 1);
    Ok(())
}

#[test]
fn test_non_object_documents() -> Result<(), anyhow::Error> {
    let mapper = JsMapFunction::new("function(doc) { emit(typeof doc, doc); }")?;
    assert_eq!(
        mapper.call_function("[1]", "a")?,
        vec![row("a", r#""object""#, "[1]")]
    );
    assert_eq!(
        mapper.call_function(r#""text""#, "s")?,
        vec![row("s", r#""string""#, r#""text""#)]
    );
    Ok(())
}

#[test]
fn test_thrown_error_discards_rows() -> Result<(), anyhow::Error> {
    let mapper = JsMapFunction::new(FAILING_MAP)?;

    let err = mapper
        .call_function(r#"{"n": 1, "fail": true}"#, "bad")
        .unwrap_err();
    assert_eq!(err, MapError::MapFunction("TypeError: refusing 1".to_string()));
    assert!(err.is_document_error());

    let rows = mapper.call_function(r#"{"n": 2}"#, "good")?;
    assert_eq!(rows, vec![row("good", r#""before""#, "2"), row("good", r#""after""#, "2")]);
    Ok(())
}

#[test]
fn test_stop() -> Result<(), anyhow::Error> {
    let mapper = JsMapFunction::new(KEY_VALUE_MAP)?;
    assert!(!mapper.is_stopped());
    mapper.stop();
    assert!(mapper.is_stopped());

    assert_eq!(
        mapper.call_function(r#"{"key": 1}"#, "d"),
        Err(MapError::EngineStopped)
    );
    assert_eq!(mapper.call_function("{", "d"), Err(MapError::EngineStopped));
    assert_eq!(
        mapper.call_document(&json("{}"), "d"),
        Err(MapError::EngineStopped)
    );

    // Idempotent.
    mapper.stop();
    assert_eq!(mapper.stats().idle, 0);
    Ok(())
}

#[test]
fn test_unified_error() -> Result<(), anyhow::Error> {
    fn index(mapper: &JsMapFunction, document: &str) -> view_map::Result<usize> {
        Ok(mapper.call_function(document, "d")?.len())
    }

    let mapper = JsMapFunction::new(KEY_VALUE_MAP)?;
    assert_eq!(index(&mapper, "{}")?, 1);

    let err = index(&mapper, "nope").unwrap_err();
    assert!(err.is_map());
    assert!(err.is_document_error());
    assert!(matches!(err, Error::Map(MapError::InvalidDocument(_))));
    Ok(())
}

#[test]
fn test_config_from_toml() -> Result<(), anyhow::Error> {
    let config = EngineConfig::from_toml_str("pool_size = 2\ntimeout_ms = 100")?;
    let mapper = JsMapFunction::with_config(
        "function(doc) { if (doc.spin) for (;;) {} emit(doc.n, null); }",
        &config,
    )?;
    assert_eq!(mapper.stats().pool_size, 2);

    let err = mapper.call_function(r#"{"spin": true}"#, "slow").unwrap_err();
    assert!(matches!(err, MapError::MapFunction(ref m) if m.contains("timeout")));
    assert_eq!(mapper.call_function(r#"{"n": 1}"#, "fast")?, vec![row("fast", "1", "null")]);
    Ok(())
}

#[test]
fn test_memory_limit() -> Result<(), anyhow::Error> {
    let config = EngineConfig::from_toml_str("memory_limit_mb = 4")?;
    let mapper = JsMapFunction::with_config(
        r#"function(doc) {
            var chunks = [];
            if (doc.hog) for (;;) chunks.push(new Array(100000).join("x"));
            emit("ok", null);
        }"#,
        &config,
    )?;
    let err = mapper.call_function(r#"{"hog": true}"#, "hog").unwrap_err();
    assert!(matches!(err, MapError::MapFunction(_)));
    assert_eq!(mapper.call_function("{}", "d")?.len(), 1);
    Ok(())
}

#[test]
fn test_rows_serialize_as_json() -> Result<(), anyhow::Error> {
    let mapper = JsMapFunction::new(KEY_VALUE_MAP)?;
    let rows = mapper.call_function(r#"{"key": ["a", 1], "value": {"x": null}}"#, "doc1")?;
    let encoded = serde_json::to_value(&rows)?;
    assert_eq!(
        encoded,
        serde_json::json!([{"id": "doc1", "key": ["a", 1.0], "value": {"x": null}}])
    );
    Ok(())
}

#[test]
fn test_proto_member_survives() -> Result<(), anyhow::Error> {
    let mapper = JsMapFunction::new(
        "function(doc) { emit(doc, Object.keys(doc).length); emit(doc.x === undefined, null); }",
    )?;

    let rows = mapper.call_function(r#"{"__proto__": 1, "a": 2}"#, "d")?;
    assert_eq!(
        rows,
        vec![
            row("d", r#"{"__proto__": 1, "a": 2}"#, "2"),
            row("d", "true", "null"),
        ]
    );

    let rows = mapper.call_function(r#"{"__proto__": {"x": 1}}"#, "d")?;
    assert_eq!(
        rows,
        vec![
            row("d", r#"{"__proto__": {"x": 1}}"#, "1"),
            row("d", "true", "null"),
        ]
    );
    Ok(())
}

#[test]
fn test_reassigning_internal_globals_does_not_break_engine() -> Result<(), anyhow::Error> {
    let mapper = JsMapFunction::new(
        "function(doc) { if (doc.bad) __viewMapFunction = 0; emit(1, 1); }",
    )?;
    assert_eq!(mapper.call_function(r#"{"bad": true}"#, "a")?, vec![row("a", "1", "1")]);
    assert_eq!(mapper.call_function("{}", "b")?, vec![row("b", "1", "1")]);
    Ok(())
}

#[test]
fn test_dates_emit_as_strings() -> Result<(), anyhow::Error> {
    let mapper = JsMapFunction::new("function(doc) { emit(new Date(doc.t), null); }")?;
    let rows = mapper.call_function(r#"{"t": 0}"#, "d")?;
    assert_eq!(rows, vec![row("d", r#""1970-01-01T00:00:00.000Z""#, "null")]);
    Ok(())
}
