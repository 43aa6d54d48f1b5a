//! Folding a flat `key, value, ...` body into a record mapping.

use crate::value::{Value, MISSING, NULL};
use std::collections::HashMap;

/// A merged record: rendered key to coerced value.
pub type Fields = HashMap<String, Value>;

/// Merge `values`, read pairwise, into a [`Fields`] mapping.
///
/// Pairs are applied in sequence order, so a repeated key keeps its last
/// value. A trailing key without a partner maps to `(Missing)`.
pub fn merge<'a, I>(values: I) -> Fields
where
    I: IntoIterator<Item = &'a Value>,
{
    let iter = values.into_iter();
    let mut fields = Fields::with_capacity((iter.size_hint().0 + 1) / 2);
    let mut iter = iter.fuse();
    while let Some(key) = iter.next() {
        let value = iter.next().cloned().unwrap_or(Value::Missing);
        fields.insert(render_key(key), coerce_value(value));
    }
    fields
}

/// Render a key to text.
pub fn render_key(key: &Value) -> String {
    match key {
        Value::Str(s) => s.clone(),
        Value::Display(Some(d)) => d.to_string(),
        Value::Display(None) => NULL.to_string(),
        other => other.to_string(),
    }
}

/// Reduce a value to something the structured encoder handles directly.
pub fn coerce_value(value: Value) -> Value {
    match value {
        // The encoder honors these natively.
        Value::Structured(_) | Value::Text(_) => value,
        Value::Error(Some(e)) => Value::Str(e.to_string()),
        Value::Error(None) => Value::Null,
        Value::Display(Some(d)) => Value::Str(d.to_string()),
        Value::Display(None) => Value::Str(NULL.to_string()),
        Value::Missing => Value::Str(MISSING.to_string()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{MarshalError, MarshalText};
    use proptest::prelude::*;
    use serde_json::json;
    use std::fmt;

    fn json_of(fields: &Fields) -> serde_json::Value {
        serde_json::to_value(fields).unwrap()
    }

    #[derive(Debug)]
    struct Point(i32, i32);

    impl fmt::Display for Point {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "({}, {})", self.0, self.1)
        }
    }

    #[derive(Debug)]
    struct Shouting;

    impl fmt::Display for Shouting {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("display")
        }
    }

    impl MarshalText for Shouting {
        fn marshal_text(&self) -> Result<String, MarshalError> {
            Ok("TEXT".to_string())
        }
    }

    #[test]
    fn test_odd_length_gets_missing_marker() {
        let body = vec![Value::from("a"), Value::from(1), Value::from("b")];
        let fields = merge(&body);
        assert_eq!(json_of(&fields), json!({"a": 1, "b": "(Missing)"}));
    }

    #[test]
    fn test_last_write_wins() {
        let body = vec![
            Value::from("k"),
            Value::from("v1"),
            Value::from("k"),
            Value::from("v2"),
        ];
        assert_eq!(json_of(&merge(&body)), json!({"k": "v2"}));
    }

    #[test]
    fn test_empty_body() {
        assert!(merge(&Vec::new()).is_empty());
    }

    #[test]
    fn test_key_coercion() {
        let body = vec![
            Value::display(Point(1, 2)),
            Value::from(true),
            Value::from(42),
            Value::from("int key"),
            Value::maybe_display(None::<Point>),
            Value::from("nil key"),
        ];
        let fields = merge(&body);
        assert_eq!(
            json_of(&fields),
            json!({"(1, 2)": true, "42": "int key", "NULL": "nil key"})
        );
    }

    #[test]
    fn test_value_coercion() {
        let err = std::io::Error::other("disk full");
        let body = vec![
            Value::from("err"),
            Value::error(err),
            Value::from("nil_err"),
            Value::maybe_error(None::<std::io::Error>),
            Value::from("point"),
            Value::display(Point(3, 4)),
            Value::from("nil_point"),
            Value::maybe_display(None::<Point>),
            Value::from("raw"),
            Value::from(1.5),
        ];
        assert_eq!(
            json_of(&merge(&body)),
            json!({
                "err": "disk full",
                "nil_err": null,
                "point": "(3, 4)",
                "nil_point": "NULL",
                "raw": 1.5,
            })
        );
    }

    #[test]
    fn test_marshalers_take_priority() {
        let body = vec![
            Value::from("text"),
            Value::text(Shouting),
            Value::from("structured"),
            Value::structured(&json!({"nested": [1, 2]})),
        ];
        let fields = merge(&body);
        assert!(matches!(fields["text"], Value::Text(_)));
        assert_eq!(
            json_of(&fields),
            json!({"text": "TEXT", "structured": {"nested": [1, 2]}})
        );
    }

    proptest! {
        #[test]
        fn prop_every_key_is_present(keys in proptest::collection::vec("[a-z]{1,4}", 0..16)) {
            let body: Vec<Value> = keys.iter().map(|k| Value::from(k.as_str())).collect();
            let fields = merge(&body);
            // Even positions are keys.
            for key in keys.iter().step_by(2) {
                prop_assert!(fields.contains_key(key));
            }
            prop_assert!(fields.len() <= (keys.len() + 1) / 2);
        }
    }
}
