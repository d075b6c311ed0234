//! Intermediate value model between raw cell text and typed fields.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;

/// A cell value on its way to a field.
///
/// Absence is modelled outside this type, as `Option<Value>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Raw text, as read from a cell or a rule literal.
    Text(String),
    /// Result of splitting text, or a decoded array.
    Sequence(Vec<Value>),
    /// A decoded nested object, keyed by field or column name.
    Record(BTreeMap<String, Value>),
}

impl Value {
    /// Borrow the text of a `Text` value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Split text on `delimiter` into a sequence of text values.
    ///
    /// Empty text splits into an empty sequence.
    pub fn split(text: &str, delimiter: &str) -> Value {
        if text.is_empty() {
            return Value::Sequence(Vec::new());
        }
        Value::Sequence(
            text.split(delimiter)
                .map(|piece| Value::Text(piece.to_string()))
                .collect(),
        )
    }

    /// Decode text holding a serialized object or array.
    ///
    /// Returns `None` when the text is not structured.
    pub fn parse_structured(text: &str) -> Option<Value> {
        let trimmed = text.trim_start();
        if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
            return None;
        }
        serde_json::from_str::<serde_json::Value>(text)
            .ok()
            .and_then(Value::from_json)
    }

    /// Convert a JSON value. `null` is absent.
    pub fn from_json(json: serde_json::Value) -> Option<Value> {
        match json {
            serde_json::Value::Null => None,
            serde_json::Value::Bool(b) => Some(Value::Text(b.to_string())),
            serde_json::Value::Number(n) => Some(Value::Text(n.to_string())),
            serde_json::Value::String(s) => Some(Value::Text(s)),
            serde_json::Value::Array(items) => Some(Value::Sequence(
                items.into_iter().filter_map(Value::from_json).collect(),
            )),
            serde_json::Value::Object(map) => Some(Value::Record(
                map.into_iter()
                    .filter_map(|(k, v)| Value::from_json(v).map(|v| (k, v)))
                    .collect(),
            )),
        }
    }

    /// Convert into a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Text(text) => serde_json::Value::String(text.clone()),
            Value::Sequence(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Record(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }

    /// Text form used in conversion errors.
    pub(crate) fn raw(&self) -> String {
        match self {
            Value::Text(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(text) => f.write_str(text),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

/// Types a field can be bound to.
pub trait FromValue: Sized {
    /// Parse a present value into `Self`.
    fn from_value(value: &Value) -> Result<Self>;
}

fn expect_text<'a>(value: &'a Value, target: &'static str) -> Result<&'a str> {
    value
        .as_text()
        .ok_or_else(|| Error::conversion(value.raw(), target))
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self> {
        expect_text(value, "String").map(str::to_string)
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self> {
        let text = expect_text(value, "bool")?;
        match text.trim().to_ascii_lowercase().as_str() {
            "" | "0" | "false" => Ok(false),
            "1" | "true" => Ok(true),
            _ => Err(Error::conversion(text, "bool")),
        }
    }
}

macro_rules! impl_from_value_int {
    ($($t:ty),*) => {
        $(
            impl FromValue for $t {
                fn from_value(value: &Value) -> Result<Self> {
                    let text = expect_text(value, stringify!($t))?;
                    let trimmed = text.trim();
                    if trimmed.is_empty() {
                        return Ok(0);
                    }
                    if let Ok(n) = trimmed.parse::<$t>() {
                        return Ok(n);
                    }
                    // Numeric cells may be stored as "3.0" or "1E2".
                    // `MAX as f64 + 1.0` is exactly 2^BITS (or 2^(BITS-1)),
                    // so the upper bound is exclusive.
                    let (lower, upper) = (<$t>::MIN as f64, <$t>::MAX as f64 + 1.0);
                    match trimmed.parse::<f64>() {
                        Ok(f) if f.fract() == 0.0 && f >= lower && f < upper => Ok(f as $t),
                        _ => Err(Error::conversion(text, stringify!($t))),
                    }
                }
            }
        )*
    };
}

impl_from_value_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

macro_rules! impl_from_value_float {
    ($($t:ty),*) => {
        $(
            impl FromValue for $t {
                fn from_value(value: &Value) -> Result<Self> {
                    let text = expect_text(value, stringify!($t))?;
                    let trimmed = text.trim();
                    if trimmed.is_empty() {
                        return Ok(0.0);
                    }
                    trimmed
                        .parse::<$t>()
                        .map_err(|_| Error::conversion(text, stringify!($t)))
                }
            }
        )*
    };
}

impl_from_value_float!(f32, f64);

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self> {
        T::from_value(value).map(Some)
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Sequence(items) => items.iter().map(T::from_value).collect(),
            Value::Text(text) if text.trim().is_empty() => Ok(Vec::new()),
            Value::Text(text) => match Value::parse_structured(text) {
                Some(Value::Sequence(items)) => items.iter().map(T::from_value).collect(),
                _ => Ok(vec![T::from_value(value)?]),
            },
            Value::Record(_) => Err(Error::conversion(value.raw(), "sequence")),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}
