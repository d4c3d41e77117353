//! Client-side routing for pagekit applications.
//!
//! A [`Router`] holds an ordered table of regex patterns and handlers. The
//! current location, read from a [`History`], is stripped of the configured
//! base URL and trailing slash, split from its query string, and handed to
//! the first matching handler along with the decoded capture groups and query
//! parameters. The handler turns them into [`RouteDetails`] for the
//! application.
//!
//! Changing the history does not notify anybody by itself, so the navigation
//! helpers fire a `popstate` event on the [`EventBus`](pagekit_core::EventBus)
//! after mutating it.

mod config;
mod decode;
mod error;
pub mod history;
pub mod navigation;
mod router;

pub use config::{RedirectPath, RedirectPaths, RouterConfig};
pub use error::RouterError;
pub use history::{History, MemoryHistory};
pub use navigation::{POPSTATE_EVENT, navigate, navigate_replace};
pub use router::{
    QueryParams, RouteCallbackParams, RouteDetails, RouteHandler, RoutePattern, Router,
    decode_query,
};
