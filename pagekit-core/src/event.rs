//! In-process event bus.
//!
//! Components that would dispatch DOM events in a browser (request progress,
//! `popstate` after a history change, toast messages) fire [`Event`]s on an
//! [`EventBus`] instead. Any number of listeners can [`subscribe`](EventBus::subscribe).

use serde_json::Value;
use smol_str::SmolStr;
use tokio::sync::broadcast;

/// Buffered events per subscriber before the slowest one starts lagging.
const DEFAULT_CAPACITY: usize = 64;

/// A named notification with a JSON detail.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Event name, e.g. `popstate`.
    pub name: SmolStr,
    /// Event payload; `Null` when the event carries none.
    pub detail: Value,
}

/// Broadcast channel for [`Event`]s. Clones share the same channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    /// Creates a bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Fires an event and returns how many subscribers received it.
    pub fn fire(&self, name: impl Into<SmolStr>, detail: Value) -> usize {
        let event = Event {
            name: name.into(),
            detail,
        };
        self.sender.send(event).unwrap_or(0)
    }

    /// Subscribes to events fired after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}
