//! Moka backend implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use moka::future::Cache;
use pagekit_backend::{Backend, BackendError, BackendResult};
use pagekit_core::{CacheEntry, DEFAULT_TABLE, LISTS_EXPIRE_TABLE, ListExpiry, SHARED_TABLE};
use serde_json::Value;
use smol_str::SmolStr;
use tokio::sync::RwLock;

/// Key under which a list table keeps its rows.
const ROWS_KEY: &str = "rows";

/// In-memory table store.
///
/// Every table is a separate Moka cache holding JSON-serialized records.
/// Entry tables are keyed by cache key, the list expiration table by list
/// name, and a list table keeps all of its rows in a single record so that
/// replacing it is one insert.
///
/// # Caveats
///
/// - Data is **not persisted**: tables are lost on process restart
/// - Records are only evicted by capacity; expiration is decided by the
///   cache store reading them
#[derive(Clone)]
pub struct MokaBackend {
    pub(crate) tables: Arc<HashMap<SmolStr, Cache<SmolStr, Bytes>>>,
    /// Serializes list replacement against list reads.
    pub(crate) lists: Arc<RwLock<()>>,
    pub(crate) label: SmolStr,
}

impl std::fmt::Debug for MokaBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaBackend")
            .field("label", &self.label)
            .field("tables", &self.tables.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl MokaBackend {
    /// Creates a new builder with no tables.
    pub fn builder() -> crate::builder::MokaBackendBuilder {
        crate::builder::MokaBackendBuilder::default()
    }

    /// Request database with the default table, the list expiration table
    /// and the given list tables.
    pub fn request_db<I, S>(list_tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        Self::builder()
            .label("request-db")
            .table(DEFAULT_TABLE)
            .table(LISTS_EXPIRE_TABLE)
            .tables(list_tables)
            .build()
    }

    /// Shared database with the shared table.
    pub fn shared_db() -> Self {
        Self::builder().label("shared-db").table(SHARED_TABLE).build()
    }

    fn table(&self, name: &str) -> BackendResult<&Cache<SmolStr, Bytes>> {
        self.tables
            .get(name)
            .ok_or_else(|| BackendError::MissingTable(name.to_owned()))
    }
}

#[async_trait]
impl Backend for MokaBackend {
    async fn read_entry(&self, table: &str, cache_key: &str) -> BackendResult<Option<CacheEntry>> {
        match self.table(table)?.get(cache_key).await {
            Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            None => Ok(None),
        }
    }

    async fn write_entry(&self, table: &str, entry: CacheEntry) -> BackendResult<()> {
        let cache = self.table(table)?;
        let raw = Bytes::from(serde_json::to_vec(&entry)?);
        cache.insert(SmolStr::new(&entry.cache_key), raw).await;
        Ok(())
    }

    async fn read_list_expiry(&self, name: &str) -> BackendResult<Option<ListExpiry>> {
        let _guard = self.lists.read().await;
        match self.table(LISTS_EXPIRE_TABLE)?.get(name).await {
            Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            None => Ok(None),
        }
    }

    async fn read_list(&self, table: &str) -> BackendResult<Vec<Value>> {
        let _guard = self.lists.read().await;
        match self.table(table)?.get(ROWS_KEY).await {
            Some(raw) => Ok(serde_json::from_slice(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    async fn replace_list(
        &self,
        table: &str,
        expiry: ListExpiry,
        rows: Vec<Value>,
    ) -> BackendResult<()> {
        let expiries = self.table(LISTS_EXPIRE_TABLE)?;
        let cache = self.table(table)?;
        // Serialize both records before touching either table.
        let raw_expiry = Bytes::from(serde_json::to_vec(&expiry)?);
        let raw_rows = Bytes::from(serde_json::to_vec(&rows)?);

        let _guard = self.lists.write().await;
        expiries.insert(SmolStr::new(&expiry.name), raw_expiry).await;
        cache.insert(SmolStr::new_static(ROWS_KEY), raw_rows).await;
        Ok(())
    }

    async fn clear(&self) -> BackendResult<()> {
        let _guard = self.lists.write().await;
        for cache in self.tables.values() {
            cache.invalidate_all();
            cache.run_pending_tasks().await;
        }
        tracing::debug!(backend = %self.label, "All tables cleared");
        Ok(())
    }

    fn has_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    fn name(&self) -> &str {
        &self.label
    }
}
