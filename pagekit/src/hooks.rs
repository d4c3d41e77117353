//! Pluggable sources of credentials.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

/// Error returned by a [`TokenProvider`].
pub type TokenError = Box<dyn std::error::Error + Send + Sync>;

/// Fetches a fresh bearer token, e.g. from an identity provider.
///
/// When configured, its token replaces the one kept in the
/// [`CredentialStore`].
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn acquire_token(&self) -> Result<String, TokenError>;
}

/// Key/value store for tokens, the equivalent of browser local storage.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn clear(&self);
}

/// In-memory [`CredentialStore`]. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
    }

    fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Source of the `Cookie` header string the CSRF token is read from.
pub trait CookieSource: Send + Sync {
    fn cookies(&self) -> Option<String>;
}

/// Fixed cookie string.
#[derive(Debug, Clone, Default)]
pub struct StaticCookies(pub String);

impl CookieSource for StaticCookies {
    fn cookies(&self) -> Option<String> {
        Some(self.0.clone())
    }
}
