//! Human readable messages from server errors.
//!
//! Servers answer failed requests with a handful of JSON shapes. The
//! [`ErrorFormatter`] flattens all of them into lines of text:
//!
//! | response body                                      | lines                          |
//! |----------------------------------------------------|--------------------------------|
//! | `"Not allowed"`                                    | `Not allowed`                  |
//! | `{"error": "Not allowed"}`                         | `Not allowed`                  |
//! | `{"errors": [{"detail": "a"}, "b"]}`               | `a`, `b`                       |
//! | `{"non_field_errors": ["a"]}`                      | `a`                            |
//! | `{"code": "x", "description": "d"}`                | `d`                            |
//! | `{"first_name": "required"}`                       | `Field First Name - required`  |
//! | `{"tags": ["too long"]}`                           | `Field Tags: too long`         |
//! | `{"address": {"zip_code": ["bad"]}}`               | `Field Address (Zip Code) - bad` |

use std::fmt;
use std::sync::Arc;

use pagekit_core::{EventBus, Payload};
use pagekit_http::RequestError;
use serde_json::{Map, Value, json};

use crate::util::is_truthy;

pub const GENERIC_MESSAGE: &str = "An error occurred. Please try again later.";
pub const PAYLOAD_TOO_LARGE_MESSAGE: &str = "The uploaded file is too large!";
pub const FORBIDDEN_MESSAGE: &str = "Forbidden action due to a lack of permissions";

/// Event fired by [`ErrorFormatter::report`] for not found errors.
pub const NOT_FOUND_EVENT: &str = "404";
/// Event fired by [`ErrorFormatter::report`] with the formatted message.
pub const TOAST_EVENT: &str = "toast";

/// Text translation hook.
pub type Translate = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Turns [`RequestError`]s into newline separated messages.
#[derive(Clone, Default)]
pub struct ErrorFormatter {
    key_translate: Option<Translate>,
    message_translate: Option<Translate>,
}

impl fmt::Debug for ErrorFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorFormatter")
            .field("key_translate", &self.key_translate.is_some())
            .field("message_translate", &self.message_translate.is_some())
            .finish()
    }
}

impl ErrorFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Translates field names. Defaults to [`default_key_translate`].
    pub fn with_key_translate<F>(mut self, translate: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.key_translate = Some(Arc::new(translate));
        self
    }

    /// Translates leaf messages sent by the server.
    pub fn with_message_translate<F>(mut self, translate: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.message_translate = Some(Arc::new(translate));
        self
    }

    /// Formats `error` as text, one message per line.
    ///
    /// `key_translate` overrides the formatter's field name translation for
    /// this call. Never returns an empty string.
    pub fn format(&self, error: &RequestError, key_translate: Option<&dyn Fn(&str) -> String>) -> String {
        let body = response_error(error);
        let messages = self.errors(&body, key_translate);
        if messages.is_empty() {
            GENERIC_MESSAGE.to_string()
        } else {
            messages.join("\n")
        }
    }

    /// Flattens a server error body into messages.
    pub fn errors(&self, errors: &Value, key_translate: Option<&dyn Fn(&str) -> String>) -> Vec<String> {
        let translate = |key: &str| match (key_translate, &self.key_translate) {
            (Some(translate), _) => translate(key),
            (None, Some(translate)) => translate(key),
            (None, None) => default_key_translate(key),
        };
        let mut messages = Vec::new();
        self.collect(errors, &translate, &mut messages);
        messages.retain(|message| !message.is_empty());
        messages
    }

    /// Fires [`NOT_FOUND_EVENT`] for 404 errors when `redirect_on_404` is
    /// set, otherwise a [`TOAST_EVENT`] carrying the formatted message.
    pub fn report(&self, error: &RequestError, events: &EventBus, redirect_on_404: bool) {
        if redirect_on_404 && error.status == 404 {
            events.fire(NOT_FOUND_EVENT, Value::Null);
            return;
        }
        let text = self.format(error, None);
        events.fire(TOAST_EVENT, json!({ "text": text, "showCloseBtn": true }));
    }

    fn message(&self, message: &str) -> String {
        match &self.message_translate {
            Some(translate) => translate(message),
            None => message.to_string(),
        }
    }

    fn collect(&self, errors: &Value, translate: &dyn Fn(&str) -> String, out: &mut Vec<String>) {
        if !is_truthy(errors) {
            return;
        }
        match errors {
            Value::String(message) => out.push(self.message(message)),
            Value::Array(items) => {
                for item in items {
                    match item {
                        Value::String(message) => out.push(self.message(message)),
                        other => self.collect(other, translate, out),
                    }
                }
            }
            Value::Object(object) => self.collect_object(object, translate, out),
            _ => {}
        }
    }

    fn collect_object(
        &self,
        object: &Map<String, Value>,
        translate: &dyn Fn(&str) -> String,
        out: &mut Vec<String>,
    ) {
        if let Some(Value::String(message)) = object.get("error")
            && !message.is_empty()
        {
            out.push(self.message(message));
            return;
        }
        if let Some(Value::Array(errors)) = object.get("errors") {
            for error in errors {
                match error {
                    Value::Object(fields) => out.extend(fields.values().map(plain_text)),
                    other => out.push(plain_text(other)),
                }
            }
            return;
        }
        if let Some(Value::Array(errors)) = object.get("non_field_errors") {
            out.extend(errors.iter().map(plain_text));
            return;
        }
        if object.get("code").is_some_and(is_truthy) {
            out.push(typed_error(object, translate));
            return;
        }

        let field_label = translate("Field");
        for (field, value) in object {
            let field_name = translate(field);
            match value {
                Value::String(message) => {
                    out.push(format!("{field_label} {field_name} - {}", self.message(message)));
                }
                Value::Array(_) => {
                    let base = format!("{field_label} {field_name}: ");
                    let mut nested = Vec::new();
                    self.collect(value, translate, &mut nested);
                    if let [single] = nested.as_slice() {
                        out.push(format!("{base}{single}"));
                    } else {
                        out.push(base);
                        out.extend(nested.into_iter().map(|message| format!(" {message}")));
                    }
                }
                Value::Object(nested_fields) => {
                    for (nested_field, nested_value) in nested_fields {
                        let mut nested = Vec::new();
                        self.collect(nested_value, translate, &mut nested);
                        out.push(format!(
                            "{field_label} {field_name} ({}) - {}",
                            translate(nested_field),
                            nested.join(",")
                        ));
                    }
                }
                _ => {}
            }
        }
    }
}

/// `first_name` becomes `First Name`.
pub fn default_key_translate(key: &str) -> String {
    key.split('_')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(part: &str) -> String {
    let mut chars = part.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Error body to format, replaced by a fixed message for some statuses.
fn response_error(error: &RequestError) -> Value {
    match error.status {
        413 => Value::from(PAYLOAD_TOO_LARGE_MESSAGE),
        403 => Value::from(FORBIDDEN_MESSAGE),
        status if status >= 401 => Value::from(GENERIC_MESSAGE),
        _ => {
            let body = match &error.response {
                Some(Payload::Text(text)) => Value::from(text.as_str()),
                Some(Payload::Json(value)) => value.clone(),
                _ => Value::Null,
            };
            if is_truthy(&body) {
                body
            } else {
                Value::from(GENERIC_MESSAGE)
            }
        }
    }
}

fn typed_error(error: &Map<String, Value>, translate: &dyn Fn(&str) -> String) -> String {
    match error.get("code").and_then(Value::as_str) {
        Some("required_in_status") => {
            let fields = error
                .get("extra")
                .and_then(|extra| extra.get("fields"))
                .and_then(Value::as_array)
                .map(|fields| {
                    fields
                        .iter()
                        .map(|field| translate(&plain_text(field)))
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default();
            format!("{}: {fields}", translate("required_in_status"))
        }
        _ => error
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    }
}

fn plain_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Array(items) => items.iter().map(plain_text).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn status_error(status: u16, body: Value) -> RequestError {
        RequestError::status(status, "", Payload::Json(body))
    }

    fn lines(body: Value) -> Vec<String> {
        ErrorFormatter::new().errors(&body, None)
    }

    #[test]
    fn test_default_key_translate() {
        assert_eq!(default_key_translate("first_name"), "First Name");
        assert_eq!(default_key_translate("Field"), "Field");
        assert_eq!(default_key_translate("a__b"), "A  B");
    }

    #[test]
    fn test_status_shortcuts() {
        let formatter = ErrorFormatter::new();
        let body = json!({"name": "bad"});
        assert_eq!(formatter.format(&status_error(413, body.clone()), None), PAYLOAD_TOO_LARGE_MESSAGE);
        assert_eq!(formatter.format(&status_error(403, body.clone()), None), FORBIDDEN_MESSAGE);
        assert_eq!(formatter.format(&status_error(500, body.clone()), None), GENERIC_MESSAGE);
        assert_eq!(formatter.format(&status_error(401, body.clone()), None), GENERIC_MESSAGE);
        assert_eq!(formatter.format(&status_error(400, body), None), "Field Name - bad");
    }

    #[test]
    fn test_missing_body_falls_back_to_generic_message() {
        let formatter = ErrorFormatter::new();
        assert_eq!(formatter.format(&status_error(400, Value::Null), None), GENERIC_MESSAGE);
        assert_eq!(formatter.format(&RequestError::aborted(), None), GENERIC_MESSAGE);
        assert_eq!(formatter.format(&status_error(400, json!({"count": 3})), None), GENERIC_MESSAGE);
    }

    #[test]
    fn test_plain_shapes() {
        assert_eq!(lines(json!("Not allowed")), vec!["Not allowed"]);
        assert_eq!(lines(json!(["a", ["b", "c"]])), vec!["a", "b", "c"]);
        assert_eq!(lines(json!({"error": "Denied"})), vec!["Denied"]);
        assert_eq!(lines(json!({"errors": [{"detail": "a"}, "b", 3]})), vec!["a", "b", "3"]);
        assert_eq!(lines(json!({"non_field_errors": ["x", "y"]})), vec!["x", "y"]);
        assert!(lines(json!(42)).is_empty());
        assert!(lines(json!(true)).is_empty());
    }

    #[test]
    fn test_typed_errors() {
        assert_eq!(
            lines(json!({"code": "required_in_status", "extra": {"fields": ["start_date", "title"]}})),
            vec!["Required In Status: Start Date, Title"]
        );
        assert_eq!(lines(json!({"code": "other", "description": "Broken"})), vec!["Broken"]);
        assert!(lines(json!({"code": "other"})).is_empty());
    }

    #[test]
    fn test_field_errors() {
        let body = json!({
            "first_name": "required",
            "tags": ["too long"],
            "dates": ["start missing", "end missing"],
            "address": {"zip_code": ["bad", "short"], "city": "unknown"},
            "ignored": null,
        });

        assert_eq!(
            lines(body),
            vec![
                "Field First Name - required",
                "Field Tags: too long",
                "Field Dates: ",
                " start missing",
                " end missing",
                "Field Address (Zip Code) - bad,short",
                "Field Address (City) - unknown",
            ]
        );
    }

    #[test]
    fn test_translation_hooks() {
        let formatter = ErrorFormatter::new()
            .with_key_translate(|key| key.to_uppercase())
            .with_message_translate(|message| format!("<{message}>"));
        let body = json!({"name": "required"});

        assert_eq!(formatter.errors(&body, None), vec!["FIELD NAME - <required>"]);
        let call_translate = |key: &str| format!("[{key}]");
        assert_eq!(
            formatter.errors(&body, Some(&call_translate)),
            vec!["[Field] [name] - <required>"]
        );
    }

    #[tokio::test]
    async fn test_report() {
        let formatter = ErrorFormatter::new();
        let events = EventBus::default();
        let mut rx = events.subscribe();

        formatter.report(&status_error(404, json!("gone")), &events, true);
        let event = rx.recv().await.unwrap();
        assert_eq!(event.name, NOT_FOUND_EVENT);

        formatter.report(&status_error(404, json!("gone")), &events, false);
        let event = rx.recv().await.unwrap();
        assert_eq!(event.name, TOAST_EVENT);
        assert_eq!(event.detail, json!({"text": "gone", "showCloseBtn": true}));
    }
}
