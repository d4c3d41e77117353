//! Options for a single request.

use std::time::Duration;

use http::Method;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::body::Body;

/// How the response body is decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Parse as JSON; unparsable bodies decode to `null`.
    #[default]
    Json,
    /// UTF-8 text.
    Text,
    /// Raw bytes.
    Blob,
    /// Raw bytes.
    ArrayBuffer,
    /// Raw bytes; parsing markup is left to the caller.
    Document,
}

impl ResponseType {
    /// `accept` value sent when the caller gives none.
    pub fn accept(&self) -> Option<&'static str> {
        match self {
            ResponseType::Json => Some("application/json"),
            ResponseType::Text => Some("text/plain"),
            ResponseType::ArrayBuffer => Some("application/octet-stream"),
            ResponseType::Blob | ResponseType::Document => None,
        }
    }
}

/// Everything needed to send one request.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub url: String,
    /// Header names are expected in lower case and are sent lower-cased.
    pub headers: IndexMap<String, String>,
    pub body: Body,
    /// `Duration::ZERO` disables the timeout.
    pub timeout: Duration,
    pub handle_as: ResponseType,
    pub with_credentials: bool,
    /// Attach the request handle to errors it produces.
    pub reject_with_request: bool,
    /// Prefix stripped from the body before JSON parsing.
    pub json_prefix: Option<String>,
}

impl RequestOptions {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: IndexMap::new(),
            body: Body::Empty,
            timeout: Duration::ZERO,
            handle_as: ResponseType::default(),
            with_credentials: false,
            reject_with_request: false,
            json_prefix: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn handle_as(mut self, handle_as: ResponseType) -> Self {
        self.handle_as = handle_as;
        self
    }

    pub fn with_credentials(mut self, with_credentials: bool) -> Self {
        self.with_credentials = with_credentials;
        self
    }

    pub fn reject_with_request(mut self, reject_with_request: bool) -> Self {
        self.reject_with_request = reject_with_request;
        self
    }

    pub fn json_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.json_prefix = Some(prefix.into());
        self
    }

    /// Looks a header up ignoring case.
    pub fn find_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}
