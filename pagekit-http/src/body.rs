//! Request bodies and their wire encoding.

use bytes::Bytes;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::Value;

use crate::form::FormData;

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Characters `encodeURIComponent` leaves alone.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// A request body before encoding.
#[derive(Debug, Clone, Default)]
pub enum Body {
    #[default]
    Empty,
    /// Sent verbatim.
    Text(String),
    /// Encoded according to the request's content type.
    Json(Value),
    /// Sent as `multipart/form-data`.
    Form(FormData),
    /// Sent verbatim.
    Bytes(Bytes),
}

impl Body {
    pub fn is_text(&self) -> bool {
        matches!(self, Body::Text(_))
    }

    pub fn is_form(&self) -> bool {
        matches!(self, Body::Form(_))
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Text(text)
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Body::Text(text.to_owned())
    }
}

impl From<Value> for Body {
    fn from(value: Value) -> Self {
        Body::Json(value)
    }
}

impl From<FormData> for Body {
    fn from(form: FormData) -> Self {
        Body::Form(form)
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Body::Bytes(bytes)
    }
}

/// Serializes a JSON body for the given content type.
///
/// Form-urlencoded content types get `key=value` pairs, every other content
/// type gets JSON text.
pub fn encode_json(value: &Value, content_type: Option<&str>) -> String {
    let essence = content_type
        .and_then(|ct| ct.split(';').next())
        .map(str::trim);
    match essence {
        Some(ct) if ct.eq_ignore_ascii_case(FORM_URLENCODED) => form_urlencode(value),
        _ => value.to_string(),
    }
}

/// Encodes the top-level fields of a JSON object as
/// `application/x-www-form-urlencoded`.
///
/// Non-object values encode to an empty string.
pub fn form_urlencode(value: &Value) -> String {
    let Value::Object(fields) = value else {
        return String::new();
    };
    fields
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Value::Null => String::new(),
                Value::String(text) => encode_piece(text),
                other => encode_piece(&other.to_string()),
            };
            format!("{}={}", encode_piece(key), value)
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn encode_piece(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n").replace('\n', "\r\n");
    utf8_percent_encode(&normalized, COMPONENT)
        .to_string()
        .replace("%20", "+")
}
