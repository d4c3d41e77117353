#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod client;
/// Client configuration loaded from YAML.
pub mod config;
/// Server error formatting.
pub mod error_format;
/// Header resolution rules.
pub mod headers;
/// Credential, token and cookie hooks.
pub mod hooks;
mod request;
mod upload;
/// URL templates and query strings.
pub mod url;
/// List, form and timing helpers.
pub mod util;

/// Installs a `tracing-subscriber` driven by the configured [`LogLevel`].
#[cfg(feature = "subscriber")]
#[cfg_attr(docsrs, doc(cfg(feature = "subscriber")))]
pub mod logging;

pub use client::{Client, ClientBuilder, REFRESH_EVENT};
pub use config::{ClientConfig, ConfigError, LogLevel};
pub use error_format::ErrorFormatter;
pub use hooks::{CookieSource, CredentialStore, MemoryCredentialStore, StaticCookies, TokenProvider};
pub use request::RequestConfig;
pub use upload::{DEFAULT_FILE_FIELD, UploadConfig};

pub use pagekit_backend::{Backend, CacheMiss, CacheStore};
pub use pagekit_core::{Endpoint, Event, EventBus, Payload};
pub use pagekit_http::{
    Body, FilePart, FormData, FormField, HttpRequest, RequestError, RequestErrorKind, ResponseType,
};
