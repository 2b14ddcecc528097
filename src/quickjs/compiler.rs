//! Compiling map function sources into QuickJS functions.

use rquickjs::convert::Coerced;
use rquickjs::{CatchResultExt, CaughtError, Ctx, Function, Value as JsValue};

use crate::map::MapError;

/// Evaluate `source` as a function expression in `ctx`.
///
/// The source must be exactly one function literal taking at most one
/// parameter (the document). Arrow functions are accepted.
pub(crate) fn compile_function<'js>(
    ctx: &Ctx<'js>,
    source: &str,
) -> Result<Function<'js>, MapError> {
    let trimmed = source.trim();
    if trimmed.is_empty() {
        return Err(MapError::Compile("source is empty".to_string()));
    }

    // The newline keeps a trailing line comment from swallowing the paren.
    let expression = format!("({trimmed}\n)");
    let value: JsValue = ctx
        .eval(expression)
        .catch(ctx)
        .map_err(|e| MapError::Compile(describe_caught(e)))?;

    let type_name = value.type_name();
    let Some(function) = value.into_function() else {
        return Err(MapError::Compile(format!(
            "source evaluates to {type_name}, expected a function"
        )));
    };

    let arity: i32 = function
        .get("length")
        .map_err(|e| MapError::Compile(e.to_string()))?;
    if arity > 1 {
        return Err(MapError::Compile(format!(
            "map function must take a single document parameter, found {arity}"
        )));
    }

    Ok(function)
}

/// Render a caught script failure as `Name: message`.
pub(crate) fn describe_caught(error: CaughtError<'_>) -> String {
    match error {
        CaughtError::Exception(exception) => {
            let message = exception.message().unwrap_or_default();
            match exception.get::<_, String>("name") {
                Ok(name) if !name.is_empty() && !message.is_empty() => {
                    format!("{name}: {message}")
                }
                Ok(name) if !name.is_empty() => name,
                _ => message,
            }
        }
        CaughtError::Value(value) => match value.get::<Coerced<String>>() {
            Ok(Coerced(text)) => format!("uncaught {text}"),
            Err(_) => format!("uncaught {}", value.type_name()),
        },
        CaughtError::Error(error) => error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rquickjs::{Context, Runtime};

    fn compile(source: &str) -> Result<(), MapError> {
        let runtime = Runtime::new().unwrap();
        let context = Context::full(&runtime).unwrap();
        context.with(|ctx| compile_function(&ctx, source).map(|_| ()))
    }

    #[test]
    fn test_compiles_function_literal() {
        compile("function(doc) {emit(doc.key, doc.value);}").unwrap();
        compile("  function (doc) {}  ").unwrap();
        compile("function() {}").unwrap();
        compile("(doc) => { emit(doc._id, null) }").unwrap();
        compile("function(doc) { emit(1, 2) } // trailing comment").unwrap();
    }

    #[test]
    fn test_syntax_error() {
        let err = compile("function(doc) { emit(").unwrap_err();
        match err {
            MapError::Compile(message) => assert!(
                message.starts_with("SyntaxError"),
                "unexpected message: {message}"
            ),
            other => panic!("expected compile error, got {other:?}"),
        }
    }

    #[test]
    fn test_not_a_function() {
        let err = compile("42").unwrap_err();
        assert!(matches!(err, MapError::Compile(ref m) if m.ends_with("expected a function")));
        assert!(matches!(compile("'function'"), Err(MapError::Compile(_))));
    }

    #[test]
    fn test_rejects_extra_parameters() {
        let err = compile("function(doc, meta) {}").unwrap_err();
        assert!(matches!(err, MapError::Compile(ref m) if m.contains("found 2")));
    }

    #[test]
    fn test_empty_source() {
        assert_eq!(
            compile("   "),
            Err(MapError::Compile("source is empty".to_string()))
        );
    }

    #[test]
    fn test_describe_thrown_values() {
        let runtime = Runtime::new().unwrap();
        let context = Context::full(&runtime).unwrap();
        context.with(|ctx| {
            let caught = ctx
                .eval::<(), _>("throw new TypeError('bad doc')")
                .catch(&ctx)
                .unwrap_err();
            assert_eq!(describe_caught(caught), "TypeError: bad doc");

            let caught = ctx.eval::<(), _>("throw 'oops'").catch(&ctx).unwrap_err();
            assert_eq!(describe_caught(caught), "uncaught oops");
        });
    }
}
