//! Per-call request configuration.

use std::time::Duration;

use http::Method;
use indexmap::IndexMap;
use pagekit_core::Endpoint;
use pagekit_http::{Body, FormData, FormField, ResponseType};
use serde_json::{Map, Value};

/// One call of [`Client::execute`](crate::Client::execute).
///
/// Only `endpoint` is required; the method defaults to GET and responses are
/// decoded as JSON.
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub endpoint: Endpoint,
    pub method: Method,
    pub body: Body,
    pub headers: IndexMap<String, String>,
    /// Send `x-csrftoken` on unsafe methods.
    pub csrf_check: bool,
    /// Overrides the client's default timeout.
    pub timeout: Option<Duration>,
    pub handle_as: ResponseType,
    pub json_prefix: Option<String>,
    pub reject_with_request: bool,
    pub with_credentials: bool,
    /// Appended to the URL as a raw query string.
    pub params: Option<Map<String, Value>>,
    /// Values for the endpoint template placeholders.
    pub template_data: Option<Map<String, Value>>,
}

impl RequestConfig {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            method: Method::GET,
            body: Body::Empty,
            headers: IndexMap::new(),
            csrf_check: true,
            timeout: None,
            handle_as: ResponseType::Json,
            json_prefix: None,
            reject_with_request: false,
            with_credentials: false,
            params: None,
            template_data: None,
        }
    }

    pub fn get(endpoint: Endpoint) -> Self {
        Self::new(endpoint)
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    /// Sends `fields` as multipart form data, flattening nested arrays and
    /// objects into bracketed names when `flatten` is set.
    pub fn multipart(mut self, fields: IndexMap<String, FormField>, flatten: bool) -> Self {
        self.body = Body::Form(FormData::from_fields(fields, flatten));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn csrf_check(mut self, enabled: bool) -> Self {
        self.csrf_check = enabled;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn handle_as(mut self, handle_as: ResponseType) -> Self {
        self.handle_as = handle_as;
        self
    }

    /// Downloads the response as CSV: raw bytes with `accept: text/csv`.
    pub fn download_csv(self) -> Self {
        self.handle_as(ResponseType::Blob)
            .header("accept", "text/csv")
            .header("content-type", "text")
    }

    pub fn json_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.json_prefix = Some(prefix.into());
        self
    }

    pub fn reject_with_request(mut self, reject: bool) -> Self {
        self.reject_with_request = reject;
        self
    }

    pub fn with_credentials(mut self, with_credentials: bool) -> Self {
        self.with_credentials = with_credentials;
        self
    }

    pub fn params(mut self, params: Map<String, Value>) -> Self {
        self.params = Some(params);
        self
    }

    pub fn template_data(mut self, data: Map<String, Value>) -> Self {
        self.template_data = Some(data);
        self
    }
}
