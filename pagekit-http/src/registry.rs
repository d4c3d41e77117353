//! Requests in flight, by caller-chosen key.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, warn};

use crate::HttpRequest;

/// Registry of active requests.
///
/// Registering a second request under a key replaces the first one, so only
/// the newest request is reachable for cancellation. Clones share the same
/// registry.
#[derive(Debug, Clone, Default)]
pub struct ActiveRequests {
    requests: Arc<DashMap<String, HttpRequest>>,
}

impl ActiveRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `request` under `key` until the returned guard is dropped.
    pub fn register(&self, key: impl Into<String>, request: HttpRequest) -> Registration {
        let key = key.into();
        self.requests.insert(key.clone(), request.clone());
        debug!(%key, "Active request registered");
        Registration {
            requests: Arc::clone(&self.requests),
            key,
            request,
        }
    }

    pub fn get(&self, key: &str) -> Option<HttpRequest> {
        self.requests.get(key).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.requests.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Aborts and forgets the request registered under `key`.
    ///
    /// Returns `false`, with a warning, when `key` is empty or unknown.
    pub fn abort(&self, key: &str) -> bool {
        if key.is_empty() {
            warn!("Aborting request by key requires a non empty key");
            return false;
        }
        match self.requests.remove(key) {
            Some((_, request)) => {
                request.abort();
                debug!(%key, "Active request aborted");
                true
            }
            None => {
                warn!(%key, "No active request found by key");
                false
            }
        }
    }

    /// Aborts every registered request.
    pub fn abort_all(&self) {
        let keys: Vec<String> = self.requests.iter().map(|entry| entry.key().clone()).collect();
        for key in keys {
            if let Some((_, request)) = self.requests.remove(&key) {
                request.abort();
            }
        }
    }
}

/// Keeps a request registered; dropping it unregisters the request unless
/// another request has taken over its key in the meantime.
#[derive(Debug)]
pub struct Registration {
    requests: Arc<DashMap<String, HttpRequest>>,
    key: String,
    request: HttpRequest,
}

impl Registration {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.requests
            .remove_if(&self.key, |_, active| active.ptr_eq(&self.request));
    }
}
