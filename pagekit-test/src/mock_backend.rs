use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use pagekit_backend::{Backend, BackendError, BackendResult};
use pagekit_core::{CacheEntry, DEFAULT_TABLE, LISTS_EXPIRE_TABLE, ListExpiry, SHARED_TABLE};
use serde_json::Value;

#[derive(Debug, Default)]
pub struct BackendCounters {
    pub read_count: AtomicUsize,
    pub read_hit_count: AtomicUsize,
    pub write_count: AtomicUsize,
    pub clear_count: AtomicUsize,
}

impl BackendCounters {
    pub fn read_count(&self) -> usize {
        self.read_count.load(Ordering::SeqCst)
    }

    pub fn read_hit_count(&self) -> usize {
        self.read_hit_count.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.write_count.load(Ordering::SeqCst)
    }

    pub fn clear_count(&self) -> usize {
        self.clear_count.load(Ordering::SeqCst)
    }
}

/// Instrumented in-memory backend.
///
/// Counts reads and writes and can be switched into failing mode, in which
/// every read and write returns a connection error.
#[derive(Clone, Debug)]
pub struct MockBackend {
    tables: Arc<HashSet<String>>,
    entries: Arc<DashMap<(String, String), CacheEntry>>,
    expiries: Arc<DashMap<String, ListExpiry>>,
    lists: Arc<DashMap<String, Vec<Value>>>,
    failing: Arc<AtomicBool>,
    pub counters: Arc<BackendCounters>,
}

impl MockBackend {
    pub fn with_tables<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tables: Arc::new(tables.into_iter().map(Into::into).collect()),
            entries: Arc::default(),
            expiries: Arc::default(),
            lists: Arc::default(),
            failing: Arc::default(),
            counters: Arc::default(),
        }
    }

    /// Request database with the default and list expiration tables plus `extra`.
    pub fn request_db(extra: &[&str]) -> Self {
        let mut tables = vec![DEFAULT_TABLE, LISTS_EXPIRE_TABLE];
        tables.extend_from_slice(extra);
        Self::with_tables(tables)
    }

    pub fn shared_db() -> Self {
        Self::with_tables([SHARED_TABLE])
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn entry(&self, table: &str, cache_key: &str) -> Option<CacheEntry> {
        self.entries
            .get(&(table.to_string(), cache_key.to_string()))
            .map(|entry| entry.value().clone())
    }

    fn check(&self, table: &str) -> BackendResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(BackendError::ConnectionError("mock backend is failing".into()));
        }
        if !self.tables.contains(table) {
            return Err(BackendError::MissingTable(table.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn read_entry(&self, table: &str, cache_key: &str) -> BackendResult<Option<CacheEntry>> {
        self.counters.read_count.fetch_add(1, Ordering::SeqCst);
        self.check(table)?;
        let entry = self.entry(table, cache_key);
        if entry.is_some() {
            self.counters.read_hit_count.fetch_add(1, Ordering::SeqCst);
        }
        Ok(entry)
    }

    async fn write_entry(&self, table: &str, entry: CacheEntry) -> BackendResult<()> {
        self.counters.write_count.fetch_add(1, Ordering::SeqCst);
        self.check(table)?;
        self.entries
            .insert((table.to_string(), entry.cache_key.clone()), entry);
        Ok(())
    }

    async fn read_list_expiry(&self, name: &str) -> BackendResult<Option<ListExpiry>> {
        self.counters.read_count.fetch_add(1, Ordering::SeqCst);
        self.check(LISTS_EXPIRE_TABLE)?;
        Ok(self.expiries.get(name).map(|expiry| expiry.value().clone()))
    }

    async fn read_list(&self, table: &str) -> BackendResult<Vec<Value>> {
        self.check(table)?;
        let rows = self
            .lists
            .get(table)
            .map(|rows| rows.value().clone())
            .unwrap_or_default();
        if !rows.is_empty() {
            self.counters.read_hit_count.fetch_add(1, Ordering::SeqCst);
        }
        Ok(rows)
    }

    async fn replace_list(
        &self,
        table: &str,
        expiry: ListExpiry,
        rows: Vec<Value>,
    ) -> BackendResult<()> {
        self.counters.write_count.fetch_add(1, Ordering::SeqCst);
        self.check(LISTS_EXPIRE_TABLE)?;
        self.check(table)?;
        self.expiries.insert(expiry.name.clone(), expiry);
        self.lists.insert(table.to_string(), rows);
        Ok(())
    }

    async fn clear(&self) -> BackendResult<()> {
        self.counters.clear_count.fetch_add(1, Ordering::SeqCst);
        self.entries.clear();
        self.expiries.clear();
        self.lists.clear();
        Ok(())
    }

    fn has_table(&self, table: &str) -> bool {
        self.tables.contains(table)
    }

    fn name(&self) -> &str {
        "mock"
    }
}
