//! Single-use cancellable request.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use bytes::BytesMut;
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use pagekit_core::EventBus;
use serde_json::json;
use tokio::sync::{Notify, watch};
use tracing::{debug, error};

use crate::body::{Body, encode_json};
use crate::response::decode;
use crate::{RequestError, RequestErrorKind, RequestOptions, Response};

/// Event fired on the bus whenever download progress changes.
pub const PROGRESS_EVENT: &str = "request-progress-changed";

/// Lifecycle of an [`HttpRequest`]. Every request ends in exactly one
/// terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RequestState {
    Idle = 0,
    Sending = 1,
    Succeeded = 2,
    Errored = 3,
    Aborted = 4,
    TimedOut = 5,
}

impl RequestState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => RequestState::Idle,
            1 => RequestState::Sending,
            2 => RequestState::Succeeded,
            3 => RequestState::Errored,
            4 => RequestState::Aborted,
            _ => RequestState::TimedOut,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestState::Idle | RequestState::Sending)
    }
}

/// Download progress of a response body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    /// `false` when the server sent no content length.
    pub length_computable: bool,
    pub loaded: u64,
    pub total: u64,
}

struct Inner {
    client: reqwest::Client,
    state: AtomicU8,
    abort: Notify,
    progress: watch::Sender<Progress>,
    events: Option<EventBus>,
}

/// A request that can be sent once and aborted from anywhere.
///
/// Clones are handles to the same request: aborting a clone aborts the
/// request sent through the original.
///
/// ```ignore
/// let request = HttpRequest::new(client);
/// let response = request.send(RequestOptions::get(url)).unwrap();
/// request.abort();
/// assert!(response.await.unwrap_err().is_aborted());
/// ```
#[derive(Clone)]
pub struct HttpRequest {
    inner: Arc<Inner>,
}

impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRequest")
            .field("state", &self.state())
            .field("progress", &*self.inner.progress.borrow())
            .finish()
    }
}

impl HttpRequest {
    pub fn new(client: reqwest::Client) -> Self {
        Self::create(client, None)
    }

    /// Creates a request that also fires progress events on `events`.
    pub fn with_events(client: reqwest::Client, events: EventBus) -> Self {
        Self::create(client, Some(events))
    }

    fn create(client: reqwest::Client, events: Option<EventBus>) -> Self {
        let (progress, _) = watch::channel(Progress::default());
        Self {
            inner: Arc::new(Inner {
                client,
                state: AtomicU8::new(RequestState::Idle as u8),
                abort: Notify::new(),
                progress,
                events,
            }),
        }
    }

    pub fn state(&self) -> RequestState {
        RequestState::from_u8(self.inner.state.load(Ordering::SeqCst))
    }

    pub fn is_aborted(&self) -> bool {
        self.state() == RequestState::Aborted
    }

    /// Watches download progress.
    pub fn progress(&self) -> watch::Receiver<Progress> {
        self.inner.progress.subscribe()
    }

    /// Returns `true` if both handles refer to the same request.
    pub fn ptr_eq(&self, other: &HttpRequest) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Starts the request.
    ///
    /// Returns `None` if this request was already sent or aborted. The
    /// returned future resolves with the response for status 200-299 and
    /// fails with a [`RequestError`] otherwise. `with_credentials` only
    /// changes anything on `wasm32`, where it maps to fetch credentials;
    /// native clients send whatever their cookie store holds.
    ///
    /// Header names are normalized to lower case on the wire; upper-case
    /// names are logged at error level and still sent.
    ///
    /// The returned future is lazy. Dropping it before it completes cancels
    /// the transfer but leaves the request in [`RequestState::Sending`]: it
    /// never reaches a terminal state and a later [`abort`](Self::abort) has
    /// no effect.
    pub fn send(
        &self,
        options: RequestOptions,
    ) -> Option<impl Future<Output = Result<Response, RequestError>> + Send + 'static> {
        self.inner
            .state
            .compare_exchange(
                RequestState::Idle as u8,
                RequestState::Sending as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .ok()?;
        let this = self.clone();
        Some(this.run(options))
    }

    /// Aborts the request.
    ///
    /// An idle request becomes aborted and can no longer be sent. A request
    /// in flight fails with [`RequestErrorKind::Aborted`]. Finished requests
    /// are left alone.
    pub fn abort(&self) {
        let aborted_idle = self
            .inner
            .state
            .compare_exchange(
                RequestState::Idle as u8,
                RequestState::Aborted as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok();
        if !aborted_idle && self.state() == RequestState::Sending {
            self.inner.abort.notify_one();
        }
    }

    async fn run(self, options: RequestOptions) -> Result<Response, RequestError> {
        let reject_with_request = options.reject_with_request;
        let method = options.method.clone();
        let url = options.url.clone();
        debug!(%method, %url, "Sending request");

        let result = tokio::select! {
            biased;
            () = self.inner.abort.notified() => Err(RequestError::aborted()),
            result = self.transfer(options) => result,
        };

        let state = match &result {
            Ok(_) => RequestState::Succeeded,
            Err(error) => match error.kind {
                RequestErrorKind::Aborted => RequestState::Aborted,
                RequestErrorKind::TimedOut => RequestState::TimedOut,
                _ => RequestState::Errored,
            },
        };
        self.inner.state.store(state as u8, Ordering::SeqCst);
        debug!(%method, %url, ?state, "Request finished");

        result.map_err(|error| {
            if reject_with_request {
                error.with_request(self.clone())
            } else {
                error
            }
        })
    }

    async fn transfer(&self, options: RequestOptions) -> Result<Response, RequestError> {
        let timeout = options.timeout;
        let exchange = self.exchange(options);
        if timeout.is_zero() {
            exchange.await
        } else {
            tokio::time::timeout(timeout, exchange)
                .await
                .unwrap_or_else(|_| Err(RequestError::timed_out()))
        }
    }

    async fn exchange(&self, options: RequestOptions) -> Result<Response, RequestError> {
        let handle_as = options.handle_as;
        let json_prefix = options.json_prefix.clone();
        let request = self.build(options)?;

        let mut response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let headers = response.headers().clone();
        let url = response.url().to_string();
        let total = response.content_length();

        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await.map_err(transport_error)? {
            body.extend_from_slice(&chunk);
            self.report_progress(Progress {
                length_computable: total.is_some(),
                loaded: body.len() as u64,
                total: total.unwrap_or_default(),
            });
        }

        let payload = decode(body.freeze(), handle_as, json_prefix.as_deref(), &url);
        if status.is_success() {
            Ok(Response {
                status,
                headers,
                url,
                payload,
            })
        } else {
            Err(RequestError::status(
                status.as_u16(),
                status.canonical_reason().unwrap_or_default(),
                payload,
            ))
        }
    }

    fn build(&self, options: RequestOptions) -> Result<reqwest::RequestBuilder, RequestError> {
        let RequestOptions {
            method,
            url,
            headers: raw_headers,
            body,
            handle_as,
            with_credentials,
            ..
        } = options;

        let mut headers = HeaderMap::new();
        for (name, value) in &raw_headers {
            if name.chars().any(|c| c.is_ascii_uppercase()) {
                error!(header = %name, "Headers must be lower case");
            }
            // `HeaderName` stores names in lower case.
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|err| {
                RequestError::configuration(format!("Invalid header name {name}: {err}"))
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|err| {
                RequestError::configuration(format!("Invalid value for header {name}: {err}"))
            })?;
            headers.insert(header_name, header_value);
        }
        if !headers.contains_key(ACCEPT)
            && let Some(accept) = handle_as.accept()
        {
            headers.insert(ACCEPT, HeaderValue::from_static(accept));
        }

        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let sends_body = method != Method::GET && method != Method::HEAD;
        let multipart = match body {
            Body::Form(ref form) if sends_body => {
                headers.remove(CONTENT_TYPE);
                Some(form.clone().into_multipart().map_err(|err| {
                    RequestError::configuration(format!("Invalid multipart form: {err}"))
                })?)
            }
            _ => None,
        };

        let mut builder = self.inner.client.request(method, url.as_str()).headers(headers);
        if let Some(form) = multipart {
            builder = builder.multipart(form);
        } else if sends_body {
            builder = match body {
                Body::Text(text) => builder.body(text),
                Body::Json(value) => builder.body(encode_json(&value, content_type.as_deref())),
                Body::Bytes(bytes) => builder.body(bytes),
                Body::Empty | Body::Form(_) => builder,
            };
        }

        #[cfg(target_arch = "wasm32")]
        let builder = if with_credentials {
            builder.fetch_credentials_include()
        } else {
            builder
        };
        #[cfg(not(target_arch = "wasm32"))]
        let _ = with_credentials;

        Ok(builder)
    }

    fn report_progress(&self, progress: Progress) {
        self.inner.progress.send_replace(progress);
        if let Some(events) = &self.inner.events {
            events.fire(
                PROGRESS_EVENT,
                json!({
                    "value": {
                        "length_computable": progress.length_computable,
                        "loaded": progress.loaded,
                        "total": progress.total,
                    }
                }),
            );
        }
    }
}

fn transport_error(error: reqwest::Error) -> RequestError {
    if error.is_timeout() {
        RequestError::timed_out()
    } else if error.is_builder() {
        RequestError::configuration(error.to_string())
    } else {
        RequestError::network(error)
    }
}
