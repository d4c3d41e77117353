//! Endpoint descriptor.
//!
//! An [`Endpoint`] names a remote resource and carries the hints that decide
//! whether, where and for how long its responses are cached. It is usually
//! declared once (in code or in a YAML configuration file) and reused for
//! every request to that resource.
//!
//! ```
//! use pagekit_core::Endpoint;
//!
//! let endpoint = Endpoint::new("/api/countries/")
//!     .with_exp(3600)
//!     .with_cache_table("countries");
//!
//! assert!(endpoint.has_expiration());
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Description of a remote resource.
///
/// Field defaults: every optional field is absent and `bypass_cache` is
/// `false`, so a bare `Endpoint::new(url)` is never cached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoint {
    /// Literal URL of the resource. Relative URLs are resolved against the
    /// client's configured origin.
    pub url: String,
    /// URL template with `<%=name%>` placeholders. Takes precedence over
    /// `url` when present.
    pub template: Option<String>,
    /// Cache lifetime in seconds. Caching is only considered when positive.
    pub exp: Option<u64>,
    /// Dedicated table holding the whole response as a list.
    pub cache_table_name: Option<String>,
    /// Explicit cache key replacing the URL in the default table.
    pub caching_key: Option<String>,
    /// Key of the entry in the shared (cross-application) table.
    pub shared_db_caching_key: Option<String>,
    /// Parameters that distinguish cached variants of the same endpoint.
    pub params: Option<Map<String, Value>>,
    /// Skip the cache read for this request. The response is still written.
    pub bypass_cache: bool,
    /// Credential store key of the bearer token sent with the request.
    pub token_key: Option<String>,
}

impl Endpoint {
    /// Creates an endpoint for a literal URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Creates an endpoint from a `<%=name%>` URL template.
    pub fn from_template(template: impl Into<String>) -> Self {
        Self {
            template: Some(template.into()),
            ..Default::default()
        }
    }

    /// Sets the cache lifetime in seconds.
    pub fn with_exp(mut self, seconds: u64) -> Self {
        self.exp = Some(seconds);
        self
    }

    /// Caches the response as a list in the given table.
    pub fn with_cache_table(mut self, name: impl Into<String>) -> Self {
        self.cache_table_name = Some(name.into());
        self
    }

    /// Uses `key` instead of the URL as the default-table cache key.
    pub fn with_caching_key(mut self, key: impl Into<String>) -> Self {
        self.caching_key = Some(key.into());
        self
    }

    /// Caches the response in the shared table under `key`.
    pub fn with_shared_db_caching_key(mut self, key: impl Into<String>) -> Self {
        self.shared_db_caching_key = Some(key.into());
        self
    }

    /// Sets the parameters that take part in the cache key.
    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        self.params = Some(params);
        self
    }

    /// Sets the credential store key of the bearer token.
    pub fn with_token_key(mut self, key: impl Into<String>) -> Self {
        self.token_key = Some(key.into());
        self
    }

    /// Requests a cache bypass.
    pub fn bypass_cache(mut self, bypass: bool) -> Self {
        self.bypass_cache = bypass;
        self
    }

    /// Returns `true` when a positive cache lifetime was provided.
    pub fn has_expiration(&self) -> bool {
        matches!(self.exp, Some(exp) if exp > 0)
    }

    /// Returns `true` when `params` is present and not empty.
    pub fn has_params(&self) -> bool {
        self.params.as_ref().is_some_and(|params| !params.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn zero_exp_is_not_an_expiration() {
        assert!(!Endpoint::new("/x").has_expiration());
        assert!(!Endpoint::new("/x").with_exp(0).has_expiration());
        assert!(Endpoint::new("/x").with_exp(1).has_expiration());
    }

    #[test]
    fn deserializes_with_defaults() {
        let endpoint: Endpoint = serde_json::from_value(json!({
            "url": "/api/users/",
            "exp": 60,
            "params": {"page": 2}
        }))
        .unwrap();

        assert_eq!(endpoint.url, "/api/users/");
        assert_eq!(endpoint.exp, Some(60));
        assert!(endpoint.has_params());
        assert!(!endpoint.bypass_cache);
        assert_eq!(endpoint.cache_table_name, None);
    }
}
