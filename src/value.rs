//! Heterogeneous values carried in a message body.
//!
//! A body is a flat sequence of [`Value`]s read as `key, value, key, value, ...`.
//! The variants mirror the capabilities the formatters care about: plain
//! scalars, values that already know how to encode themselves (structured or
//! text), errors, and anything that only offers `Display`/`Debug`.
//!
//! Errors and displayable values may be "typed nil" (`None`): the slot has a
//! declared capability but no value behind it. The formatters check for this
//! explicitly instead of calling into a missing value.

use crate::level::Level;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// Boxed error returned by [`MarshalText`] implementations.
pub type MarshalError = Box<dyn StdError + Send + Sync>;

/// A value that renders itself to text for structured output.
///
/// Structured sinks call this while encoding, so it takes priority over any
/// `Display`/`Error` representation the type may also have.
pub trait MarshalText: Send + Sync + fmt::Debug {
    fn marshal_text(&self) -> Result<String, MarshalError>;
}

/// One element of a message body.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Level(Level),
    /// Already structured; encoded as-is.
    Structured(serde_json::Value),
    /// Encodes itself to text when serialized.
    Text(Arc<dyn MarshalText>),
    /// An error; `None` is a typed nil.
    Error(Option<Arc<dyn StdError + Send + Sync>>),
    /// Something with a human-readable representation; `None` is a typed nil.
    Display(Option<Arc<dyn fmt::Display + Send + Sync>>),
    /// Anything else, rendered through its `Debug` output.
    Debug(Arc<dyn fmt::Debug + Send + Sync>),
    /// Placeholder for the value of a trailing key without a partner.
    Missing,
}

/// Text used for a missing value.
pub const MISSING: &str = "(Missing)";

/// Text substituted for a nil displayable value.
pub const NULL: &str = "NULL";

impl Value {
    pub fn error<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Value::Error(Some(Arc::new(err)))
    }

    pub fn maybe_error<E>(err: Option<E>) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Value::Error(err.map(|e| Arc::new(e) as Arc<dyn StdError + Send + Sync>))
    }

    pub fn display<D>(value: D) -> Self
    where
        D: fmt::Display + Send + Sync + 'static,
    {
        Value::Display(Some(Arc::new(value)))
    }

    pub fn maybe_display<D>(value: Option<D>) -> Self
    where
        D: fmt::Display + Send + Sync + 'static,
    {
        Value::Display(value.map(|d| Arc::new(d) as Arc<dyn fmt::Display + Send + Sync>))
    }

    pub fn debug<D>(value: D) -> Self
    where
        D: fmt::Debug + Send + Sync + 'static,
    {
        Value::Debug(Arc::new(value))
    }

    pub fn text<T>(value: T) -> Self
    where
        T: MarshalText + 'static,
    {
        Value::Text(Arc::new(value))
    }

    /// Serialize `value` up front and carry the result as structured data.
    /// A value that fails to serialize is carried as that error instead.
    pub fn structured<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(json) => Value::Structured(json),
            Err(e) => Value::error(e),
        }
    }

    pub fn is_str(&self) -> bool {
        matches!(self, Value::Str(_))
    }

    /// Encode to a JSON value, running any text marshaler.
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null | Value::Error(None) | Value::Display(None) => f.write_str("<nil>"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::UInt(u) => write!(f, "{}", u),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => f.write_str(s),
            Value::Level(level) => write!(f, "{}", level),
            Value::Structured(json) => write!(f, "{}", json),
            Value::Text(t) => match t.marshal_text() {
                Ok(s) => f.write_str(&s),
                Err(e) => write!(f, "!(MARSHAL ERROR: {})", e),
            },
            Value::Error(Some(e)) => write!(f, "{}", e),
            Value::Display(Some(d)) => write!(f, "{}", d),
            Value::Debug(d) => write!(f, "{:?}", d),
            Value::Missing => f.write_str(MISSING),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Int(i) => f.debug_tuple("Int").field(i).finish(),
            Value::UInt(u) => f.debug_tuple("UInt").field(u).finish(),
            Value::Float(x) => f.debug_tuple("Float").field(x).finish(),
            Value::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Value::Level(l) => f.debug_tuple("Level").field(l).finish(),
            Value::Structured(j) => f.debug_tuple("Structured").field(j).finish(),
            Value::Text(t) => f.debug_tuple("Text").field(t).finish(),
            Value::Error(e) => f
                .debug_tuple("Error")
                .field(&e.as_ref().map(|e| e.to_string()))
                .finish(),
            Value::Display(d) => f
                .debug_tuple("Display")
                .field(&d.as_ref().map(|d| d.to_string()))
                .finish(),
            Value::Debug(d) => f.debug_tuple("Debug").field(d).finish(),
            Value::Missing => f.write_str("Missing"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null | Value::Error(None) => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::UInt(u) => serializer.serialize_u64(*u),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Level(level) => level.serialize(serializer),
            Value::Structured(json) => json.serialize(serializer),
            Value::Text(t) => {
                let text = t.marshal_text().map_err(serde::ser::Error::custom)?;
                serializer.serialize_str(&text)
            }
            Value::Error(Some(e)) => serializer.collect_str(e),
            Value::Display(None) => serializer.serialize_str(NULL),
            Value::Display(Some(d)) => serializer.collect_str(d),
            Value::Debug(d) => serializer.serialize_str(&format!("{:?}", d)),
            Value::Missing => serializer.serialize_str(MISSING),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::UInt(u)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            other => Value::Structured(other),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::Str(s.clone())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Level> for Value {
    fn from(level: Level) -> Self {
        Value::Level(level)
    }
}

macro_rules! impl_from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(v as i64)
            }
        })*
    };
}

macro_rules! impl_from_unsigned {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::UInt(v as u64)
            }
        })*
    };
}

impl_from_signed!(i8, i16, i32, i64, isize);
impl_from_unsigned!(u8, u16, u32, u64, usize);

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v as f64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
