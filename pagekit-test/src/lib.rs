//! Test support shared by the pagekit crates.

pub mod mock_backend;
pub mod tracing;

pub use mock_backend::{BackendCounters, MockBackend};
pub use self::tracing::{CapturedEvent, LogCollector, create_log_collector, with_log_capture};
