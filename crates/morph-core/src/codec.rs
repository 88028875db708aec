//! # Codecs
//!
//! A codec wrapper pairs a schema with decode/encode functions between the
//! transport form of a value and its structural form. The built-in codecs
//! back the coercion tags; custom codecs carry user closures.
//!
//! Each function here converts one layer only. Walking a value alongside
//! its schema tree is the validator compiler's job.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::tag::CoercionTag;

/// A single-layer conversion function.
pub type CodecFn = Arc<dyn Fn(Value) -> Result<Value, String> + Send + Sync>;

/// A user-supplied codec.
///
/// The name participates in structural digests: two custom codecs with the
/// same name are assumed to be the same conversion.
#[derive(Clone)]
pub struct CustomCodec {
    name: String,
    decode: CodecFn,
    encode: CodecFn,
}

impl CustomCodec {
    /// Build a custom codec from decode and encode closures.
    pub fn new<D, E>(name: impl Into<String>, decode: D, encode: E) -> Self
    where
        D: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
        E: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            decode: Arc::new(decode),
            encode: Arc::new(encode),
        }
    }
}

/// Transport conversion attached to a codec wrapper.
#[derive(Clone)]
pub enum Codec {
    /// Object as a JSON string.
    ObjectString,
    /// Array as a JSON string.
    ArrayString,
    /// Array as a comma-separated or JSON string.
    ArrayQuery,
    /// Boolean as `"true"` / `"false"`.
    BooleanString,
    /// Number as a numeric string.
    NumericString,
    /// User-supplied conversion.
    Custom(CustomCodec),
}

impl Codec {
    /// The built-in codec backing a coercion tag.
    pub fn for_tag(tag: CoercionTag) -> Self {
        match tag {
            CoercionTag::ObjectString => Self::ObjectString,
            CoercionTag::ArrayString => Self::ArrayString,
            CoercionTag::ArrayQuery => Self::ArrayQuery,
            CoercionTag::BooleanString => Self::BooleanString,
            CoercionTag::NumericString => Self::NumericString,
        }
    }

    /// The coercion tag this codec implements, if it is a built-in.
    pub fn tag(&self) -> Option<CoercionTag> {
        match self {
            Self::ObjectString => Some(CoercionTag::ObjectString),
            Self::ArrayString => Some(CoercionTag::ArrayString),
            Self::ArrayQuery => Some(CoercionTag::ArrayQuery),
            Self::BooleanString => Some(CoercionTag::BooleanString),
            Self::NumericString => Some(CoercionTag::NumericString),
            Self::Custom(_) => None,
        }
    }

    /// Stable name used in diagnostics and digests.
    pub fn name(&self) -> &str {
        match self {
            Self::Custom(c) => &c.name,
            other => other.tag().map(|t| t.as_str()).unwrap_or_default(),
        }
    }

    /// Convert a transport value into its structural form.
    ///
    /// Values already in structural form pass through unchanged, as do
    /// values of an unrelated type (the validator reports those).
    pub fn decode(&self, value: Value) -> Result<Value, String> {
        match self {
            Self::ObjectString => match value {
                Value::String(s) => match serde_json::from_str::<Value>(&s) {
                    Ok(parsed @ Value::Object(_)) => Ok(parsed),
                    Ok(_) => Err("expected a JSON object string".to_string()),
                    Err(e) => Err(format!("invalid JSON object string: {e}")),
                },
                other => Ok(other),
            },
            Self::ArrayString => match value {
                Value::String(s) => match serde_json::from_str::<Value>(&s) {
                    Ok(parsed @ Value::Array(_)) => Ok(parsed),
                    Ok(_) => Err("expected a JSON array string".to_string()),
                    Err(e) => Err(format!("invalid JSON array string: {e}")),
                },
                other => Ok(other),
            },
            Self::ArrayQuery => match value {
                Value::String(s) if s.is_empty() => Ok(Value::Array(Vec::new())),
                Value::String(s) if s.trim_start().starts_with('[') => {
                    match serde_json::from_str::<Value>(&s) {
                        Ok(parsed @ Value::Array(_)) => Ok(parsed),
                        _ => Ok(split_query(&s)),
                    }
                }
                Value::String(s) => Ok(split_query(&s)),
                Value::Array(items) => Ok(Value::Array(items)),
                Value::Null => Ok(Value::Null),
                scalar => Ok(Value::Array(vec![scalar])),
            },
            Self::BooleanString => match value {
                Value::String(s) => match s.as_str() {
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    other => Err(format!("expected \"true\" or \"false\", got {other:?}")),
                },
                other => Ok(other),
            },
            Self::NumericString => match value {
                Value::String(s) => parse_number(&s)
                    .ok_or_else(|| format!("expected a numeric string, got {s:?}")),
                other => Ok(other),
            },
            Self::Custom(c) => (c.decode)(value),
        }
    }

    /// Convert a structural value back into its transport form.
    pub fn encode(&self, value: Value) -> Result<Value, String> {
        match self {
            Self::ObjectString | Self::ArrayString => match value {
                s @ Value::String(_) => Ok(s),
                other => serde_json::to_string(&other)
                    .map(Value::String)
                    .map_err(|e| e.to_string()),
            },
            Self::ArrayQuery => match value {
                Value::Array(items) if items.iter().all(is_scalar) => Ok(Value::String(
                    items.iter().map(scalar_text).collect::<Vec<_>>().join(","),
                )),
                s @ Value::String(_) => Ok(s),
                other => serde_json::to_string(&other)
                    .map(Value::String)
                    .map_err(|e| e.to_string()),
            },
            Self::BooleanString => match value {
                Value::Bool(b) => Ok(Value::String(b.to_string())),
                other => Ok(other),
            },
            Self::NumericString => match value {
                Value::Number(n) => Ok(Value::String(n.to_string())),
                other => Ok(other),
            },
            Self::Custom(c) => (c.encode)(value),
        }
    }
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Codec({})", self.name())
    }
}

/// Parse a numeric string, preferring an integer representation.
pub fn parse_number(s: &str) -> Option<Value> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::from(i));
    }
    s.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
}

fn split_query(s: &str) -> Value {
    Value::Array(
        s.split(',')
            .map(|part| Value::String(part.to_string()))
            .collect(),
    )
}

fn is_scalar(v: &Value) -> bool {
    matches!(v, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

fn scalar_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
