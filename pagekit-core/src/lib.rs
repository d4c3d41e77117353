#![warn(missing_docs)]
//! # pagekit-core
//!
//! Core types shared by the pagekit crates.
//!
//! This crate has no I/O of its own. It defines the vocabulary the other
//! crates speak:
//!
//! - [`Endpoint`] - description of a remote resource and its caching hints
//! - [`Payload`] - decoded response data (JSON, text or bytes)
//! - [`CacheEntry`] and [`ListExpiry`] - what storage backends persist
//! - [`CacheLocation`] and [`cache_key`] - where and under which key an
//!   endpoint's response is cached
//! - [`Clock`] - time source used for cache expiration
//! - [`EventBus`] - in-process notifications (progress, navigation, toasts)

pub mod clock;
pub mod endpoint;
pub mod event;
pub mod key;
pub mod payload;
pub mod value;

pub use clock::{Clock, ManualClock, SystemClock};
pub use endpoint::Endpoint;
pub use event::{Event, EventBus};
pub use key::{CacheLocation, DEFAULT_TABLE, LISTS_EXPIRE_TABLE, SHARED_TABLE, cache_key};
pub use payload::Payload;
pub use value::{CacheEntry, ListExpiry, expire_at, is_expired};
#[doc(hidden)]
pub use smol_str::SmolStr;
