//! Client configuration.
//!
//! Configuration is plain serde data, usually loaded from YAML:
//!
//! ```yaml
//! origin: https://example.org
//! language: fr
//! timeout: 30s
//! log_level: warn
//! endpoints:
//!   countries:
//!     url: /api/countries/
//!     exp: 3600
//!     cache_table_name: countries
//!   intervention:
//!     template: /api/interventions/<%=id%>/
//!     token_key: jwt
//! ```

use std::path::Path;
use std::time::Duration;

use indexmap::IndexMap;
use pagekit_core::Endpoint;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the cookie holding the CSRF token unless configured otherwise.
pub const DEFAULT_CSRF_COOKIE: &str = "csrftoken";

/// Errors raised while loading or using configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Yaml(String),
    #[error("endpoint `{0}` is not configured")]
    UnknownEndpoint(String),
    #[error("To generate URL from endpoint url template you need valid template string")]
    EmptyTemplate,
    #[error("invalid template placeholder: {0}")]
    Placeholder(#[from] regex::Error),
    #[error("failed to install log subscriber: {0}")]
    Subscriber(String),
}

/// Verbosity of the library's own logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[default]
    Off,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// `EnvFilter` directive for this level.
    pub fn directive(&self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Settings shared by every request a [`Client`](crate::Client) sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Scheme and host relative URLs are resolved against, e.g.
    /// `https://example.org`.
    pub origin: Option<String>,
    /// Sent as the `language` header to same-origin URLs.
    pub language: Option<String>,
    /// Turns every cache read and write off.
    pub cache_disabled: bool,
    pub csrf_cookie_name: String,
    /// Default request timeout; zero disables it.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    pub log_level: LogLevel,
    /// Named endpoints, in declaration order.
    pub endpoints: IndexMap<String, Endpoint>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            origin: None,
            language: None,
            cache_disabled: false,
            csrf_cookie_name: DEFAULT_CSRF_COOKIE.to_string(),
            timeout: Duration::ZERO,
            log_level: LogLevel::default(),
            endpoints: IndexMap::new(),
        }
    }
}

impl ClientConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        serde_saphyr::from_str(yaml).map_err(|err| ConfigError::Yaml(err.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_endpoint(mut self, name: impl Into<String>, endpoint: Endpoint) -> Self {
        self.endpoints.insert(name.into(), endpoint);
        self
    }

    pub fn endpoint(&self, name: &str) -> Result<&Endpoint, ConfigError> {
        self.endpoints
            .get(name)
            .ok_or_else(|| ConfigError::UnknownEndpoint(name.to_string()))
    }

    /// Origin without a trailing slash, or an empty string.
    pub(crate) fn base_site(&self) -> &str {
        self.origin
            .as_deref()
            .map(|origin| origin.trim_end_matches('/'))
            .unwrap_or_default()
    }
}
