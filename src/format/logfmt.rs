//! Minimal logfmt encoder: `key=value key="quoted value"`.

use crate::value::{Value, MISSING};
use thiserror::Error;

/// Errors raised while encoding a record.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("nil key")]
    NilKey,

    #[error("invalid key {0:?}")]
    InvalidKey(String),

    #[error("unable to marshal value for key {key:?}: {reason}")]
    Marshal { key: String, reason: String },
}

/// Encode `values`, read pairwise, as one logfmt line (without newline).
///
/// A trailing key without a partner is encoded with `(Missing)` as value.
pub fn encode_keyvals<'a, I>(values: I) -> Result<String, EncodeError>
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut out = String::new();
    let mut iter = values.into_iter().fuse();
    while let Some(key) = iter.next() {
        let key = encode_key(key)?;
        let value = match iter.next() {
            Some(value) => value_text(&key, value)?,
            None => MISSING.to_string(),
        };
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&key);
        out.push('=');
        write_value(&mut out, &value);
    }
    Ok(out)
}

fn encode_key(key: &Value) -> Result<String, EncodeError> {
    let text = match key {
        Value::Null | Value::Error(None) | Value::Display(None) => {
            return Err(EncodeError::NilKey)
        }
        other => other.to_string(),
    };
    // Characters that cannot appear in a key are dropped.
    let key: String = text.chars().filter(|c| !invalid_key_char(*c)).collect();
    if key.is_empty() {
        return Err(EncodeError::InvalidKey(text));
    }
    Ok(key)
}

fn value_text(key: &str, value: &Value) -> Result<String, EncodeError> {
    match value {
        Value::Null | Value::Error(None) | Value::Display(None) => Ok("null".to_string()),
        Value::Text(t) => t.marshal_text().map_err(|e| EncodeError::Marshal {
            key: key.to_string(),
            reason: e.to_string(),
        }),
        other => Ok(other.to_string()),
    }
}

fn invalid_key_char(c: char) -> bool {
    c <= ' ' || c == '=' || c == '"' || c.is_control()
}

fn needs_quotes(s: &str) -> bool {
    s.is_empty() || s.chars().any(|c| c <= ' ' || c == '=' || c == '"' || c.is_control())
}

fn write_value(out: &mut String, value: &str) {
    if !needs_quotes(value) {
        out.push_str(value);
        return;
    }
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{MarshalError, MarshalText};

    #[derive(Debug)]
    struct Refuses;

    impl MarshalText for Refuses {
        fn marshal_text(&self) -> Result<String, MarshalError> {
            Err("no text".into())
        }
    }

    #[test]
    fn test_plain_pairs() {
        let body = vec![
            Value::from("user"),
            Value::from("bob"),
            Value::from("id"),
            Value::from(7),
        ];
        assert_eq!(encode_keyvals(&body).unwrap(), "user=bob id=7");
    }

    #[test]
    fn test_quoting() {
        let body = vec![
            Value::from("msg"),
            Value::from("hello world"),
            Value::from("q"),
            Value::from("say \"hi\""),
            Value::from("empty"),
            Value::from(""),
            Value::from("nl"),
            Value::from("a\nb"),
        ];
        assert_eq!(
            encode_keyvals(&body).unwrap(),
            r#"msg="hello world" q="say \"hi\"" empty="" nl="a\nb""#
        );
    }

    #[test]
    fn test_odd_length() {
        let body = vec![Value::from("a"), Value::from(1), Value::from("b")];
        assert_eq!(encode_keyvals(&body).unwrap(), "a=1 b=(Missing)");
    }

    #[test]
    fn test_nil_values() {
        let body = vec![
            Value::from("err"),
            Value::maybe_error(None::<std::io::Error>),
        ];
        assert_eq!(encode_keyvals(&body).unwrap(), "err=null");
    }

    #[test]
    fn test_invalid_keys() {
        let body = vec![Value::from("bad key"), Value::from(1)];
        assert_eq!(encode_keyvals(&body).unwrap(), "badkey=1");

        let body = vec![Value::from(" = "), Value::from(1)];
        assert!(matches!(
            encode_keyvals(&body),
            Err(EncodeError::InvalidKey(_))
        ));

        let body = vec![Value::Null, Value::from(1)];
        assert!(matches!(encode_keyvals(&body), Err(EncodeError::NilKey)));
    }

    #[test]
    fn test_marshal_failure() {
        let body = vec![Value::from("v"), Value::text(Refuses)];
        let err = encode_keyvals(&body).unwrap_err();
        assert!(err.to_string().contains("no text"));
    }
}
