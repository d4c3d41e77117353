//! In-memory table store for pagekit, powered by [Moka](https://github.com/moka-rs/moka).
//!
//! [`MokaBackend`] stands in for a browser's local database: a fixed set of
//! named tables, declared up front, each an independent Moka cache.
//!
//! ```
//! use pagekit_backend::Backend;
//! use pagekit_core::{DEFAULT_TABLE, LISTS_EXPIRE_TABLE};
//! use pagekit_moka::MokaBackend;
//!
//! let request_db = MokaBackend::request_db(["countries"]);
//! assert!(request_db.has_table(DEFAULT_TABLE));
//! assert!(request_db.has_table(LISTS_EXPIRE_TABLE));
//! assert!(request_db.has_table("countries"));
//! ```
#![warn(missing_docs)]

mod backend;
mod builder;

pub use backend::MokaBackend;
pub use builder::MokaBackendBuilder;
