//! Cache store adapter.
//!
//! [`CacheStore`] decides whether a request is cacheable and reads/writes
//! cached payloads for an [`Endpoint`]. Caching is strictly best-effort:
//! a failed write is logged and the original data is returned unchanged, and
//! a failed read is reported as a [`CacheMiss`] the caller falls through on.
//!
//! # Example
//!
//! ```ignore
//! use pagekit_backend::CacheStore;
//! use pagekit_core::{Endpoint, Payload};
//! use serde_json::json;
//!
//! let store = CacheStore::builder().request_db(backend).build();
//! let endpoint = Endpoint::new("/api/x/").with_exp(60);
//!
//! if store.is_cacheable(None, &endpoint) {
//!     let data = store.write(Payload::Json(json!({"v": 1})), &endpoint).await;
//!     assert_eq!(store.read(&endpoint).await.unwrap(), data);
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use http::Method;
use pagekit_core::{
    CacheEntry, CacheLocation, Clock, Endpoint, LISTS_EXPIRE_TABLE, ListExpiry, Payload,
    SHARED_TABLE, SystemClock, cache_key, expire_at,
};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{Backend, BackendError};

/// Why a cache read produced no data.
#[derive(Debug, Error)]
pub enum CacheMiss {
    /// The endpoint asked to skip the cache.
    #[error("Bypass cache requested")]
    Bypass,
    /// No entry exists for the endpoint.
    #[error("Empty collection")]
    Empty,
    /// An entry exists but its expiration has passed.
    #[error("Expired data")]
    Expired,
    /// The resolved storage location is not configured.
    #[error("cache location {0} is not configured")]
    Unavailable(String),
    /// The backend failed.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Cache policy over a request database and an optional shared database.
#[derive(Clone)]
pub struct CacheStore {
    request_db: Option<Arc<dyn Backend>>,
    shared_db: Option<Arc<dyn Backend>>,
    clock: Arc<dyn Clock>,
    disabled: bool,
}

impl fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("request_db", &self.request_db.as_ref().map(|db| db.name()))
            .field("shared_db", &self.shared_db.as_ref().map(|db| db.name()))
            .field("disabled", &self.disabled)
            .finish()
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl CacheStore {
    /// Creates a builder with no databases, the system clock and caching enabled.
    pub fn builder() -> CacheStoreBuilder {
        CacheStoreBuilder::default()
    }

    /// Returns `true` if a request with `method` (GET when `None`) to
    /// `endpoint` should go through the cache.
    ///
    /// Requires caching to be enabled, a GET request, a positive `exp`, and
    /// the endpoint's storage location to be configured right now.
    pub fn is_cacheable(&self, method: Option<&Method>, endpoint: &Endpoint) -> bool {
        if self.disabled {
            return false;
        }
        let is_get = method.is_none_or(|method| *method == Method::GET);
        is_get && endpoint.has_expiration() && self.is_configured(CacheLocation::resolve(endpoint))
    }

    /// Reads the cached payload for `endpoint`.
    pub async fn read(&self, endpoint: &Endpoint) -> Result<Payload, CacheMiss> {
        if endpoint.bypass_cache {
            return Err(CacheMiss::Bypass);
        }
        let location = CacheLocation::resolve(endpoint);
        let result = self.read_location(location, endpoint).await;
        if let Err(miss) = &result {
            warn!(%location, error = %miss, "Failed to get data from cache");
        }
        result
    }

    /// Writes `data` for `endpoint` and returns it.
    ///
    /// Never fails: storage errors are logged and the data is returned as is.
    pub async fn write(&self, data: Payload, endpoint: &Endpoint) -> Payload {
        let location = CacheLocation::resolve(endpoint);
        match self.write_location(location, &data, endpoint).await {
            Ok(()) => debug!(%location, "Response cached"),
            Err(error) => warn!(%location, %error, "Failed to cache data. Data not cached."),
        }
        data
    }

    /// Removes every record from every configured database.
    pub async fn clear(&self) -> Result<(), BackendError> {
        for db in self.request_db.iter().chain(self.shared_db.iter()) {
            db.clear().await?;
        }
        Ok(())
    }

    fn is_configured(&self, location: CacheLocation<'_>) -> bool {
        match location {
            CacheLocation::Shared => self
                .shared_db
                .as_ref()
                .is_some_and(|db| db.has_table(SHARED_TABLE)),
            CacheLocation::Default | CacheLocation::Specified(_) => {
                self.request_db.as_ref().is_some_and(|db| {
                    db.has_table(LISTS_EXPIRE_TABLE) && db.has_table(location.table())
                })
            }
        }
    }

    fn database(&self, location: CacheLocation<'_>) -> Result<&Arc<dyn Backend>, CacheMiss> {
        let db = match location {
            CacheLocation::Shared => self.shared_db.as_ref(),
            CacheLocation::Default | CacheLocation::Specified(_) => self.request_db.as_ref(),
        };
        db.filter(|_| self.is_configured(location))
            .ok_or_else(|| CacheMiss::Unavailable(location.to_string()))
    }

    async fn read_location(
        &self,
        location: CacheLocation<'_>,
        endpoint: &Endpoint,
    ) -> Result<Payload, CacheMiss> {
        let db = self.database(location)?;
        let now = self.clock.now_millis();
        match location {
            CacheLocation::Default | CacheLocation::Shared => {
                let key = entry_key(location, endpoint);
                let entry = db
                    .read_entry(location.table(), &key)
                    .await?
                    .ok_or(CacheMiss::Empty)?;
                if entry.is_expired(now) {
                    return Err(CacheMiss::Expired);
                }
                Ok(entry.data)
            }
            CacheLocation::Specified(table) => {
                let expiry = db
                    .read_list_expiry(table)
                    .await?
                    .ok_or(CacheMiss::Empty)?;
                if expiry.is_expired(now) {
                    return Err(CacheMiss::Expired);
                }
                let rows = db.read_list(table).await?;
                Ok(Payload::Json(Value::Array(rows)))
            }
        }
    }

    async fn write_location(
        &self,
        location: CacheLocation<'_>,
        data: &Payload,
        endpoint: &Endpoint,
    ) -> Result<(), CacheMiss> {
        let db = self.database(location)?;
        let expire = expire_at(self.clock.now_millis(), endpoint.exp.unwrap_or_default());
        match location {
            CacheLocation::Default | CacheLocation::Shared => {
                let entry = CacheEntry::new(entry_key(location, endpoint), data.clone(), expire);
                db.write_entry(location.table(), entry).await?;
            }
            CacheLocation::Specified(table) => {
                let Payload::Json(Value::Array(rows)) = data else {
                    return Err(BackendError::InvalidData(format!(
                        "Response data should be an array to be able to cache it into table {table}"
                    ))
                    .into());
                };
                db.replace_list(table, ListExpiry::new(table, expire), rows.clone())
                    .await?;
            }
        }
        Ok(())
    }
}

fn entry_key(location: CacheLocation<'_>, endpoint: &Endpoint) -> String {
    match location {
        CacheLocation::Shared => endpoint.shared_db_caching_key.clone().unwrap_or_default(),
        _ => cache_key(endpoint),
    }
}

/// Builder for [`CacheStore`].
pub struct CacheStoreBuilder {
    request_db: Option<Arc<dyn Backend>>,
    shared_db: Option<Arc<dyn Backend>>,
    clock: Arc<dyn Clock>,
    disabled: bool,
}

impl Default for CacheStoreBuilder {
    fn default() -> Self {
        Self {
            request_db: None,
            shared_db: None,
            clock: Arc::new(SystemClock),
            disabled: false,
        }
    }
}

impl CacheStoreBuilder {
    /// Sets the request database (default and list tables).
    pub fn request_db<B: Backend + 'static>(mut self, backend: B) -> Self {
        let backend: Arc<dyn Backend> = Arc::new(backend);
        self.request_db = Some(backend);
        self
    }

    /// Sets the shared database.
    pub fn shared_db<B: Backend + 'static>(mut self, backend: B) -> Self {
        let backend: Arc<dyn Backend> = Arc::new(backend);
        self.shared_db = Some(backend);
        self
    }

    /// Sets the clock used for expiration.
    pub fn clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Disables caching altogether.
    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Builds the store.
    pub fn build(self) -> CacheStore {
        CacheStore {
            request_db: self.request_db,
            shared_db: self.shared_db,
            clock: self.clock,
            disabled: self.disabled,
        }
    }
}
