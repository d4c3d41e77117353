//! Cache key composition and storage location resolution.
//!
//! Every cacheable endpoint resolves to exactly one [`CacheLocation`]:
//!
//! 1. **Shared** - `shared_db_caching_key` is set; the entry lives in the
//!    shared database's [`SHARED_TABLE`] under that key.
//! 2. **Default** - `cache_table_name` names [`DEFAULT_TABLE`]; the entry
//!    lives in the request database's default table under [`cache_key`].
//! 3. **Specified** - any other `cache_table_name`; the whole response list
//!    replaces that table and its expiration is tracked in
//!    [`LISTS_EXPIRE_TABLE`].
//! 4. **Default** - nothing else applies.
//!
//! ```
//! use pagekit_core::{CacheLocation, Endpoint, cache_key};
//! use serde_json::json;
//!
//! let endpoint = Endpoint::new("/api/items/")
//!     .with_params(json!({"page": 2}).as_object().unwrap().clone());
//!
//! assert_eq!(CacheLocation::resolve(&endpoint), CacheLocation::Default);
//! assert_eq!(cache_key(&endpoint), r#"/api/items/_{"page":2}"#);
//! ```

use std::fmt;

use serde_json::Value;

use crate::Endpoint;

/// Default table of the request database, one entry per cache key.
pub const DEFAULT_TABLE: &str = "ajaxDefaultDataTable";

/// Table of the request database holding list expiration records.
pub const LISTS_EXPIRE_TABLE: &str = "listsExpireMapTable";

/// Table of the shared database.
pub const SHARED_TABLE: &str = "collections";

/// Where an endpoint's response is cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLocation<'a> {
    /// Request database, default table.
    Default,
    /// Request database, dedicated list table with the given name.
    Specified(&'a str),
    /// Shared database, [`SHARED_TABLE`].
    Shared,
}

impl<'a> CacheLocation<'a> {
    /// Resolves the location for `endpoint`.
    pub fn resolve(endpoint: &'a Endpoint) -> Self {
        if non_empty(endpoint.shared_db_caching_key.as_deref()).is_some() {
            return CacheLocation::Shared;
        }
        match non_empty(endpoint.cache_table_name.as_deref()) {
            Some(DEFAULT_TABLE) | None => CacheLocation::Default,
            Some(table) => CacheLocation::Specified(table),
        }
    }

    /// Name of the table holding the data for this location.
    pub fn table(&self) -> &'a str {
        match self {
            CacheLocation::Default => DEFAULT_TABLE,
            CacheLocation::Specified(table) => table,
            CacheLocation::Shared => SHARED_TABLE,
        }
    }
}

impl fmt::Display for CacheLocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheLocation::Default => f.write_str(DEFAULT_TABLE),
            CacheLocation::Specified(table) => write!(f, "specified table {table}"),
            CacheLocation::Shared => write!(f, "shared {SHARED_TABLE}"),
        }
    }
}

/// Composes the default-table cache key of `endpoint`.
///
/// The base is `caching_key` when non-empty, otherwise the URL (or template
/// when no URL is set). Non-empty `params` are appended as `_` followed by
/// their JSON encoding, so each parameterization is cached independently.
pub fn cache_key(endpoint: &Endpoint) -> String {
    let mut key = match non_empty(endpoint.caching_key.as_deref()) {
        Some(caching_key) => caching_key.to_owned(),
        None if endpoint.url.is_empty() => endpoint.template.clone().unwrap_or_default(),
        None => endpoint.url.clone(),
    };
    if let Some(params) = endpoint.params.as_ref().filter(|params| !params.is_empty()) {
        key.push('_');
        key.push_str(&Value::Object(params.clone()).to_string());
    }
    key
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}
