//! Decoded response data.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response data after decoding according to the requested response type.
///
/// JSON responses that fail to parse are represented as `Json(Value::Null)`,
/// never as an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Payload {
    /// Parsed JSON document.
    Json(Value),
    /// Response text.
    Text(String),
    /// Raw bytes (blob, array buffer, document).
    Binary(Bytes),
}

impl Payload {
    /// Returns the JSON value if this is a JSON payload.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Consumes the payload and returns the JSON value if it is one.
    pub fn into_json(self) -> Option<Value> {
        match self {
            Payload::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the text if this is a text payload.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Converts the payload into a JSON value.
    ///
    /// Text becomes a JSON string and bytes become an array of numbers.
    pub fn to_json_value(&self) -> Value {
        match self {
            Payload::Json(value) => value.clone(),
            Payload::Text(text) => Value::String(text.clone()),
            Payload::Binary(bytes) => {
                Value::Array(bytes.iter().map(|byte| Value::from(*byte)).collect())
            }
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Json(value)
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Payload::Binary(bytes)
    }
}
