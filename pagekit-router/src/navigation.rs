//! History navigation outside of a [`Router`](crate::Router).

use pagekit_core::EventBus;
use serde_json::Value;

use crate::history::History;

/// Event routers listen to for location changes.
pub const POPSTATE_EVENT: &str = "popstate";

/// Pushes `path` and fires `event`, `popstate` when `None` or empty.
pub fn navigate(history: &dyn History, events: &EventBus, path: &str, event: Option<&str>) {
    history.push_state(path);
    events.fire(event_name(event), Value::Null);
}

/// Replaces the current entry with `path` and fires `event`, `popstate` when
/// `None` or empty. Use it when the back button should skip the current page.
pub fn navigate_replace(history: &dyn History, events: &EventBus, path: &str, event: Option<&str>) {
    history.replace_state(path);
    events.fire(event_name(event), Value::Null);
}

fn event_name(event: Option<&str>) -> &str {
    event.filter(|event| !event.is_empty()).unwrap_or(POPSTATE_EVENT)
}
