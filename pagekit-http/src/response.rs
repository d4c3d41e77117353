//! Response decoding.

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use pagekit_core::Payload;
use serde_json::Value;
use tracing::warn;

use crate::ResponseType;

/// A successful response.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Final URL after redirects.
    pub url: String,
    pub payload: Payload,
}

impl Response {
    pub fn status_text(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or_default()
    }

    pub fn into_payload(self) -> Payload {
        self.payload
    }
}

/// Decodes a response body according to `handle_as`.
pub fn decode(body: Bytes, handle_as: ResponseType, json_prefix: Option<&str>, url: &str) -> Payload {
    match handle_as {
        ResponseType::Json => Payload::Json(parse_json(&body, json_prefix, url)),
        ResponseType::Text => Payload::Text(String::from_utf8_lossy(&body).into_owned()),
        ResponseType::Blob | ResponseType::ArrayBuffer | ResponseType::Document => {
            Payload::Binary(body)
        }
    }
}

fn parse_json(body: &[u8], json_prefix: Option<&str>, url: &str) -> Value {
    let body = json_prefix
        .and_then(|prefix| body.strip_prefix(prefix.as_bytes()))
        .unwrap_or(body);
    match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(error) => {
            warn!(%url, %error, "Failed to parse JSON sent from server");
            Value::Null
        }
    }
}
