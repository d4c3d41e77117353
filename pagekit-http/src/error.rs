use std::fmt;

use pagekit_core::Payload;
use thiserror::Error;

use crate::HttpRequest;

/// Message of the error produced by an aborted request.
pub const ABORTED_MESSAGE: &str = "Request aborted";

/// What made a request fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestErrorKind {
    /// [`HttpRequest::abort`] was called before the response arrived.
    Aborted,
    /// The configured timeout elapsed.
    TimedOut,
    /// The transport failed before a response arrived.
    Network,
    /// The server answered outside the 2xx range.
    Status,
    /// The request could not be built.
    Configuration,
}

impl fmt::Display for RequestErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestErrorKind::Aborted => "aborted",
            RequestErrorKind::TimedOut => "timed out",
            RequestErrorKind::Network => "network",
            RequestErrorKind::Status => "status",
            RequestErrorKind::Configuration => "configuration",
        };
        f.write_str(name)
    }
}

/// A failed request.
///
/// `status` is `0` unless the server answered. For [`RequestErrorKind::Status`]
/// errors `response` carries the decoded error body.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct RequestError {
    pub kind: RequestErrorKind,
    pub status: u16,
    pub status_text: String,
    pub message: String,
    pub response: Option<Payload>,
    /// Set when the request was sent with `reject_with_request`.
    pub request: Option<HttpRequest>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl RequestError {
    fn new(kind: RequestErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: 0,
            status_text: String::new(),
            message: message.into(),
            response: None,
            request: None,
            source: None,
        }
    }

    pub fn aborted() -> Self {
        let mut error = Self::new(RequestErrorKind::Aborted, ABORTED_MESSAGE);
        error.status_text = ABORTED_MESSAGE.to_string();
        error
    }

    pub fn timed_out() -> Self {
        Self::new(RequestErrorKind::TimedOut, "Request timed out")
    }

    pub fn network<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let mut error = Self::new(RequestErrorKind::Network, format!("Network error: {source}"));
        error.source = Some(Box::new(source));
        error
    }

    pub fn status(status: u16, status_text: impl Into<String>, response: Payload) -> Self {
        let status_text = status_text.into();
        let mut error = Self::new(
            RequestErrorKind::Status,
            format!("Request failed with status {status} {status_text}"),
        );
        error.status = status;
        error.status_text = status_text;
        error.response = Some(response);
        error
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(RequestErrorKind::Configuration, message)
    }

    pub fn with_request(mut self, request: HttpRequest) -> Self {
        self.request = Some(request);
        self
    }

    pub fn is_aborted(&self) -> bool {
        self.kind == RequestErrorKind::Aborted
    }
}
