//! Log capture for asserting on emitted `tracing` events.
//!
//! ```ignore
//! let collector = create_log_collector();
//! let _guard = tracing::dispatcher::set_default(collector.dispatch());
//! // code under test
//! collector.assert_logged(Level::WARN, "No active request found by key");
//! ```

use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing::{Dispatch, Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::Registry;
use tracing_subscriber::layer::{Context, SubscriberExt};

/// Captured event.
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub target: String,
    /// The `message` field.
    pub message: String,
    /// Every other field, formatted.
    pub fields: Vec<(String, String)>,
}

impl CapturedEvent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

struct EventCaptureLayer {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: Vec<(String, String)>,
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields.push((field.name().to_string(), format!("{:?}", value)));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push((field.name().to_string(), value.to_string()));
        }
    }
}

impl<S: Subscriber> Layer<S> for EventCaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        let metadata = event.metadata();
        let captured = CapturedEvent {
            level: *metadata.level(),
            target: metadata.target().to_string(),
            message: visitor.message,
            fields: visitor.fields,
        };
        if let Ok(mut events) = self.events.lock() {
            events.push(captured);
        }
    }
}

/// Collector for captured events.
#[derive(Clone)]
pub struct LogCollector {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
    dispatch: Dispatch,
}

/// Creates a collector with its own dispatch.
pub fn create_log_collector() -> LogCollector {
    let events = Arc::new(Mutex::new(Vec::new()));
    let layer = EventCaptureLayer {
        events: events.clone(),
    };
    let dispatch = Dispatch::new(Registry::default().with(layer));
    LogCollector { events, dispatch }
}

impl LogCollector {
    /// Dispatch to install with `tracing::dispatcher::set_default`.
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Events at `level`.
    pub fn at_level(&self, level: Level) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.level == level)
            .collect()
    }

    /// Returns `true` if an event at `level` has a message containing `text`.
    pub fn logged(&self, level: Level, text: &str) -> bool {
        self.events
            .lock()
            .unwrap()
            .iter()
            .any(|event| event.level == level && event.message.contains(text))
    }

    pub fn assert_logged(&self, level: Level, text: &str) {
        if !self.logged(level, text) {
            panic!(
                "Expected {level} event containing '{text}'. Captured: {:?}",
                self.events()
                    .iter()
                    .map(|e| (e.level, e.message.clone()))
                    .collect::<Vec<_>>()
            );
        }
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

/// Runs `f` with event capturing enabled.
pub fn with_log_capture<F, R>(f: F) -> (R, LogCollector)
where
    F: FnOnce() -> R,
{
    let collector = create_log_collector();
    let result = tracing::dispatcher::with_default(collector.dispatch(), f);
    (result, collector)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_capture() {
        let ((), collector) = with_log_capture(|| {
            tracing::warn!(key = "list", "No active request found by key");
            tracing::debug!("ignored by assertions below");
        });

        collector.assert_logged(Level::WARN, "No active request");
        let warnings = collector.at_level(Level::WARN);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field("key"), Some("list"));
        assert!(!collector.logged(Level::ERROR, "No active request"));
    }

    #[test]
    fn test_clear() {
        let ((), collector) = with_log_capture(|| tracing::error!("boom"));
        collector.clear();
        assert!(collector.events().is_empty());
    }
}
