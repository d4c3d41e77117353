//! Small helpers shared by list pages and forms.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::task::JoinHandle;

use crate::url::value_text;

/// Builds `key=value&...` from filter parameters.
///
/// Falsy values and empty arrays are skipped, arrays are joined with `,` and
/// `true` is written as `true`. With `exclude_first_page`, `page=1` is left
/// out. Values are not percent-encoded.
pub fn build_url_query_string(params: &Map<String, Value>, exclude_first_page: bool) -> String {
    params
        .iter()
        .filter(|(_, value)| is_truthy(value))
        .filter_map(|(name, value)| {
            let text = match value {
                Value::Array(_) => value_text(value),
                Value::Bool(_) => "true".to_string(),
                Value::Number(number)
                    if exclude_first_page && name == "page" && number.as_f64() == Some(1.0) =>
                {
                    return None;
                }
                other => value_text(other).trim().to_string(),
            };
            (!text.is_empty()).then(|| format!("{name}={text}"))
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Values present in only one of the two lists.
///
/// Each value of `base` cancels at most one equal value of `values`. When
/// `property` is set, `base` holds objects and their `property` is compared.
pub fn arrays_diff(base: &[Value], values: &[Value], property: Option<&str>) -> Vec<Value> {
    let pick = |item: &Value| match property {
        Some(property) => item.get(property).cloned().unwrap_or(Value::Null),
        None => item.clone(),
    };
    if base.is_empty() {
        return values.to_vec();
    }
    if values.is_empty() {
        return base.iter().map(pick).collect();
    }

    let mut remaining = values.to_vec();
    let mut diff = Vec::new();
    for item in base {
        let needle = pick(item);
        match remaining.iter().position(|value| *value == needle) {
            Some(index) => {
                remaining.remove(index);
            }
            None => diff.push(needle),
        }
    }
    diff.extend(remaining);
    diff
}

/// Appends the `new` items whose `id` is not in `existing`, then sorts
/// everything by `name`.
pub fn merge_and_sort_items(existing: &[Value], new: &[Value]) -> Vec<Value> {
    let mut items = existing.to_vec();
    items.extend(
        new.iter()
            .filter(|item| !existing.iter().any(|known| known.get("id") == item.get("id")))
            .cloned(),
    );
    items.sort_by(|a, b| {
        let name = |item: &Value| item.get("name").and_then(Value::as_str).unwrap_or_default().to_string();
        name(a).cmp(&name(b))
    });
    items
}

/// Options whose numeric `id` is one of `ids`.
pub fn filter_by_ids(options: &[Value], ids: &[&str]) -> Vec<Value> {
    let ids: Vec<f64> = ids.iter().filter_map(|id| id.trim().parse().ok()).collect();
    options
        .iter()
        .filter(|option| {
            let id = match option.get("id") {
                Some(Value::Number(number)) => number.as_f64(),
                Some(Value::String(text)) => text.trim().parse().ok(),
                _ => None,
            };
            id.is_some_and(|id| ids.contains(&id))
        })
        .cloned()
        .collect()
}

/// Last path segment of `url`, query string excluded.
pub fn file_name_from_url(url: Option<&str>) -> String {
    let Some(url) = url else {
        return String::new();
    };
    let path = url.split('?').next().unwrap_or_default();
    path.rsplit('/').next().unwrap_or_default().to_string()
}

pub fn capitalize_first_letter(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `true` for decimals such as `12.00` whose fraction is zero.
pub fn decimal_fraction_equals_zero(value: &str) -> bool {
    match value.rfind('.') {
        Some(index) if index > 0 => {
            let fraction = value[index + 1..].trim();
            fraction.is_empty() || fraction.parse::<f64>().is_ok_and(|fraction| fraction == 0.0)
        }
        _ => false,
    }
}

/// Resolves once `condition` holds, checking every `interval`.
pub async fn wait_for_condition<F>(mut condition: F, interval: Duration)
where
    F: FnMut() -> bool,
{
    loop {
        tokio::time::sleep(interval).await;
        if condition() {
            return;
        }
    }
}

/// Delays calls to a function until `delay` has passed without a new call.
///
/// Only the arguments of the last call are used. Must be called from within a
/// tokio runtime.
pub struct Debouncer<F> {
    func: Arc<F>,
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl<F> Debouncer<F> {
    pub fn new(func: F, delay: Duration) -> Self {
        Self {
            func: Arc::new(func),
            delay,
            pending: Mutex::new(None),
        }
    }

    /// Schedules `func(arg)`, cancelling the call scheduled before it.
    pub fn call<A>(&self, arg: A)
    where
        F: Fn(A) + Send + Sync + 'static,
        A: Send + 'static,
    {
        let func = Arc::clone(&self.func);
        let delay = self.delay;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            func(arg);
        });
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = pending.replace(task) {
            previous.abort();
        }
    }

    /// Drops the scheduled call, if any.
    pub fn cancel(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = pending.take() {
            task.abort();
        }
    }
}

impl<F> std::fmt::Debug for Debouncer<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer").field("delay", &self.delay).finish()
    }
}

/// JavaScript truthiness of a JSON value.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|number| number != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
