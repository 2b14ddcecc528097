//! Conversion between [`Value`] and QuickJS values.
//!
//! Host to JS builds plain arrays and objects with own data properties, the
//! way `JSON.parse` does, so a `"__proto__"` member stays a member.
//!
//! JS to host mirrors `JSON.stringify` for the values it accepts:
//! - `toJSON()` is called when an object has one (a `Date` becomes its ISO
//!   string);
//! - `undefined`, functions and symbols become `null` inside arrays and are
//!   skipped as object members;
//! - BigInts are rejected;
//! - integers and floats both become [`Value::Number`].

use std::collections::BTreeMap;

use rquickjs::function::This;
use rquickjs::object::Property;
use rquickjs::{Array, Ctx, FromJs, IntoJs, Object, Type, Value as JsValue};

use crate::value::Value;

/// Deepest array/object nesting accepted from a script.
///
/// Cyclic structures passed to `emit` hit this limit instead of recursing
/// forever.
pub const MAX_DEPTH: usize = 512;

impl<'js> FromJs<'js> for Value {
    fn from_js(_ctx: &Ctx<'js>, value: JsValue<'js>) -> rquickjs::Result<Self> {
        from_js_value(&value, 0)
    }
}

impl<'js> IntoJs<'js> for &Value {
    fn into_js(self, ctx: &Ctx<'js>) -> rquickjs::Result<JsValue<'js>> {
        match self {
            Value::Null => Ok(JsValue::new_null(ctx.clone())),
            Value::Bool(b) => Ok(JsValue::new_bool(ctx.clone(), *b)),
            Value::Number(n) => Ok(JsValue::new_number(ctx.clone(), *n)),
            Value::String(s) => Ok(rquickjs::String::from_str(ctx.clone(), s)?.into_value()),
            Value::Array(items) => {
                let array = Array::new(ctx.clone())?;
                for (index, item) in items.iter().enumerate() {
                    array.set(index, item)?;
                }
                Ok(array.into_value())
            }
            Value::Object(map) => {
                let object = Object::new(ctx.clone())?;
                for (key, item) in map {
                    // `set` would run the `__proto__` setter.
                    object.prop(
                        key.as_str(),
                        Property::from(item).writable().enumerable().configurable(),
                    )?;
                }
                Ok(object.into_value())
            }
        }
    }
}

impl<'js> IntoJs<'js> for Value {
    fn into_js(self, ctx: &Ctx<'js>) -> rquickjs::Result<JsValue<'js>> {
        (&self).into_js(ctx)
    }
}

/// Whether a JS value is dropped when it appears as an object member.
fn has_no_json_form(value: &JsValue<'_>) -> bool {
    matches!(
        value.type_of(),
        Type::Undefined | Type::Uninitialized | Type::Function | Type::Constructor | Type::Symbol
    )
}

fn from_js_value(value: &JsValue<'_>, depth: usize) -> rquickjs::Result<Value> {
    if depth > MAX_DEPTH {
        return Err(rquickjs::Error::new_from_js_message(
            "object",
            "JSON value",
            format!("nesting deeper than {MAX_DEPTH} levels (cyclic structure?)"),
        ));
    }

    match value.type_of() {
        Type::Uninitialized | Type::Undefined | Type::Null => Ok(Value::Null),
        Type::Bool => Ok(Value::Bool(value.as_bool().unwrap_or_default())),
        Type::Int | Type::Float => Ok(Value::Number(value.as_number().unwrap_or(f64::NAN))),
        Type::String => {
            let text = match value.as_string() {
                Some(s) => s.to_string()?,
                None => String::new(),
            };
            Ok(Value::String(text))
        }
        Type::Array => match value.as_array() {
            Some(array) => array_from_js(array, depth),
            None => Ok(Value::Null),
        },
        Type::Function | Type::Constructor | Type::Symbol => Ok(Value::Null),
        Type::BigInt => Err(rquickjs::Error::new_from_js_message(
            "bigint",
            "JSON value",
            "BigInt values cannot be serialized",
        )),
        _ => match value.as_object() {
            Some(object) => match to_json_replacement(object)? {
                Some(replacement) => from_js_value(&replacement, depth + 1),
                None => object_from_js(object, depth),
            },
            None => Ok(Value::Null),
        },
    }
}

/// The result of `object.toJSON("")`, if the object has such a method.
fn to_json_replacement<'js>(object: &Object<'js>) -> rquickjs::Result<Option<JsValue<'js>>> {
    let method: JsValue = object.get("toJSON")?;
    let Some(method) = method.into_function() else {
        return Ok(None);
    };
    method.call((This(object.clone()), "")).map(Some)
}

fn array_from_js(array: &Array<'_>, depth: usize) -> rquickjs::Result<Value> {
    let mut items = Vec::with_capacity(array.len());
    for item in array.iter::<JsValue>() {
        items.push(from_js_value(&item?, depth + 1)?);
    }
    Ok(Value::Array(items))
}

fn object_from_js(object: &Object<'_>, depth: usize) -> rquickjs::Result<Value> {
    let mut map = BTreeMap::new();
    for prop in object.props::<String, JsValue>() {
        let (key, item) = prop?;
        if has_no_json_form(&item) {
            continue;
        }
        map.insert(key, from_js_value(&item, depth + 1)?);
    }
    Ok(Value::Object(map))
}
