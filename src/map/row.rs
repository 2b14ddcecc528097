//! View rows produced by map functions.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// One `emit(key, value)` result, optionally tagged with its document ID.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewRow {
    /// Identifier of the document that produced the row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub key: Value,
    pub value: Value,
}

impl ViewRow {
    /// Create an untagged row.
    pub fn new(key: impl Into<Value>, value: impl Into<Value>) -> Self {
        Self {
            id: None,
            key: key.into(),
            value: value.into(),
        }
    }

    /// Return the row tagged with a document ID.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_without_id() {
        let row = ViewRow::new("k", 1.5);
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"key":"k","value":1.5}"#);
    }

    #[test]
    fn test_serialize_with_id() {
        let row = ViewRow::new(Value::Null, vec![Value::Null]).with_id("doc1");
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"id":"doc1","key":null,"value":[null]}"#);
    }

    #[test]
    fn test_deserialize() {
        let row: ViewRow = serde_json::from_str(r#"{"key": [1, "a"], "value": {}}"#).unwrap();
        assert_eq!(row.id, None);
        assert_eq!(
            row.key,
            Value::Array(vec![Value::Number(1.0), Value::from("a")])
        );
        assert_eq!(row.value, Value::Object(Default::default()));
    }
}
