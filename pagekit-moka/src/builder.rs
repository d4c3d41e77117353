//! Builder for configuring [`MokaBackend`].

use std::collections::HashMap;
use std::sync::Arc;

use moka::future::CacheBuilder;
use smol_str::SmolStr;
use tokio::sync::RwLock;

use crate::backend::MokaBackend;

/// Maximum records per table unless configured otherwise.
const DEFAULT_MAX_ENTRIES: u64 = 10_000;

/// Builder for creating and configuring a [`MokaBackend`].
///
/// Use [`MokaBackend::builder`] to create a new builder instance. Tables
/// must be declared here; a backend never grows new tables afterwards.
///
/// ```
/// use pagekit_backend::Backend;
/// use pagekit_moka::MokaBackend;
///
/// let backend = MokaBackend::builder()
///     .label("offline")
///     .max_entries(500)
///     .tables(["users", "groups"])
///     .build();
///
/// assert!(backend.has_table("users"));
/// assert!(!backend.has_table("sections"));
/// ```
pub struct MokaBackendBuilder {
    tables: Vec<SmolStr>,
    max_entries: u64,
    label: SmolStr,
}

impl Default for MokaBackendBuilder {
    fn default() -> Self {
        Self {
            tables: Vec::new(),
            max_entries: DEFAULT_MAX_ENTRIES,
            label: SmolStr::new_static("moka"),
        }
    }
}

impl MokaBackendBuilder {
    /// Declares a table.
    pub fn table(mut self, name: impl Into<SmolStr>) -> Self {
        self.tables.push(name.into());
        self
    }

    /// Declares several tables.
    pub fn tables<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        self.tables.extend(names.into_iter().map(Into::into));
        self
    }

    /// Limits every table to `max_entries` records, evicting least recently
    /// used records beyond that.
    pub fn max_entries(mut self, max_entries: u64) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Sets the backend label used in log records.
    pub fn label(mut self, label: impl Into<SmolStr>) -> Self {
        self.label = label.into();
        self
    }

    /// Builds the backend.
    pub fn build(self) -> MokaBackend {
        let tables = self
            .tables
            .into_iter()
            .map(|name| {
                let cache = CacheBuilder::new(self.max_entries).name(&name).build();
                (name, cache)
            })
            .collect::<HashMap<_, _>>();
        MokaBackend {
            tables: Arc::new(tables),
            lists: Arc::new(RwLock::new(())),
            label: self.label,
        }
    }
}
