//! Traits and structs for pagekit storage interaction.
//!
//! [`Backend`] is the low-level table store a browser-style local database
//! is expected to provide. [`CacheStore`] sits on top of one request database
//! and one optional shared database and implements the cache policy:
//! cacheability checks, expiration, and best-effort writes that never fail
//! the caller.
mod backend;
pub mod store;

pub use backend::{Backend, BackendResult};
pub use store::{CacheMiss, CacheStore, CacheStoreBuilder};
use thiserror::Error;

/// Failure of a table store operation.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The underlying store could not be reached or refused the operation.
    #[error(transparent)]
    ConnectionError(Box<dyn std::error::Error + Send + Sync>),
    /// A record could not be encoded to or decoded from JSON.
    #[error(transparent)]
    FormatError(#[from] serde_json::Error),
    /// The backend was not created with this table.
    #[error("table `{0}` is not defined in this database")]
    MissingTable(String),
    /// Data rejected before it reached storage.
    #[error("{0}")]
    InvalidData(String),
}
