use std::sync::Arc;

use async_trait::async_trait;
use pagekit_core::{CacheEntry, ListExpiry};
use serde_json::Value;

use crate::BackendError;

pub type BackendResult<T> = Result<T, BackendError>;

/// A local database made of named tables.
///
/// Tables are declared when the backend is created; [`has_table`](Backend::has_table)
/// reports whether a table exists so callers can check that a database is
/// configured before using it. Two kinds of tables are used:
///
/// - entry tables hold [`CacheEntry`] records keyed by `cache_key`
/// - list tables hold plain rows, gated by a [`ListExpiry`] record
#[async_trait]
pub trait Backend: Sync + Send {
    async fn read_entry(&self, table: &str, cache_key: &str) -> BackendResult<Option<CacheEntry>>;

    async fn write_entry(&self, table: &str, entry: CacheEntry) -> BackendResult<()>;

    async fn read_list_expiry(&self, name: &str) -> BackendResult<Option<ListExpiry>>;

    async fn read_list(&self, table: &str) -> BackendResult<Vec<Value>>;

    /// Records `expiry` and replaces every row of `table` with `rows`.
    ///
    /// Implementations must apply both changes or neither.
    async fn replace_list(
        &self,
        table: &str,
        expiry: ListExpiry,
        rows: Vec<Value>,
    ) -> BackendResult<()>;

    /// Removes every record from every table.
    async fn clear(&self) -> BackendResult<()>;

    fn has_table(&self, table: &str) -> bool;

    /// Returns the name of this backend, used in log records.
    fn name(&self) -> &str {
        "backend"
    }
}

#[async_trait]
impl Backend for &dyn Backend {
    async fn read_entry(&self, table: &str, cache_key: &str) -> BackendResult<Option<CacheEntry>> {
        (*self).read_entry(table, cache_key).await
    }

    async fn write_entry(&self, table: &str, entry: CacheEntry) -> BackendResult<()> {
        (*self).write_entry(table, entry).await
    }

    async fn read_list_expiry(&self, name: &str) -> BackendResult<Option<ListExpiry>> {
        (*self).read_list_expiry(name).await
    }

    async fn read_list(&self, table: &str) -> BackendResult<Vec<Value>> {
        (*self).read_list(table).await
    }

    async fn replace_list(
        &self,
        table: &str,
        expiry: ListExpiry,
        rows: Vec<Value>,
    ) -> BackendResult<()> {
        (*self).replace_list(table, expiry, rows).await
    }

    async fn clear(&self) -> BackendResult<()> {
        (*self).clear().await
    }

    fn has_table(&self, table: &str) -> bool {
        (*self).has_table(table)
    }

    fn name(&self) -> &str {
        (*self).name()
    }
}

#[async_trait]
impl Backend for Box<dyn Backend> {
    async fn read_entry(&self, table: &str, cache_key: &str) -> BackendResult<Option<CacheEntry>> {
        (**self).read_entry(table, cache_key).await
    }

    async fn write_entry(&self, table: &str, entry: CacheEntry) -> BackendResult<()> {
        (**self).write_entry(table, entry).await
    }

    async fn read_list_expiry(&self, name: &str) -> BackendResult<Option<ListExpiry>> {
        (**self).read_list_expiry(name).await
    }

    async fn read_list(&self, table: &str) -> BackendResult<Vec<Value>> {
        (**self).read_list(table).await
    }

    async fn replace_list(
        &self,
        table: &str,
        expiry: ListExpiry,
        rows: Vec<Value>,
    ) -> BackendResult<()> {
        (**self).replace_list(table, expiry, rows).await
    }

    async fn clear(&self) -> BackendResult<()> {
        (**self).clear().await
    }

    fn has_table(&self, table: &str) -> bool {
        (**self).has_table(table)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[async_trait]
impl Backend for Arc<dyn Backend> {
    async fn read_entry(&self, table: &str, cache_key: &str) -> BackendResult<Option<CacheEntry>> {
        (**self).read_entry(table, cache_key).await
    }

    async fn write_entry(&self, table: &str, entry: CacheEntry) -> BackendResult<()> {
        (**self).write_entry(table, entry).await
    }

    async fn read_list_expiry(&self, name: &str) -> BackendResult<Option<ListExpiry>> {
        (**self).read_list_expiry(name).await
    }

    async fn read_list(&self, table: &str) -> BackendResult<Vec<Value>> {
        (**self).read_list(table).await
    }

    async fn replace_list(
        &self,
        table: &str,
        expiry: ListExpiry,
        rows: Vec<Value>,
    ) -> BackendResult<()> {
        (**self).replace_list(table, expiry, rows).await
    }

    async fn clear(&self) -> BackendResult<()> {
        (**self).clear().await
    }

    fn has_table(&self, table: &str) -> bool {
        (**self).has_table(table)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
