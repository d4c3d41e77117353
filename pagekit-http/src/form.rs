//! Multipart form data.
//!
//! [`FormData`] is an ordered list of text and file fields. It is built either
//! field by field or from a tree of [`FormField`]s, optionally flattening
//! nested arrays and objects into bracketed field names:
//!
//! | value                        | field names                   |
//! |------------------------------|-------------------------------|
//! | `tags: ["a", "b"]`           | `tags[0]`, `tags[1]`          |
//! | `user: {name: "x"}`          | `user[_obj][name]`            |
//! | `rows: [{id: 1}]`            | `rows[0][_obj][id]`           |
//! | `ids: []`                    | `ids` (empty value)           |

use bytes::Bytes;
use indexmap::IndexMap;
use serde_json::Value;

/// A file attached to a form.
#[derive(Debug, Clone, PartialEq)]
pub struct FilePart {
    pub file_name: String,
    pub content: Bytes,
    pub mime: Option<String>,
}

impl FilePart {
    pub fn new(file_name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
            mime: None,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }
}

/// A value appended to a form.
#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
    Text(String),
    File(FilePart),
}

/// A node of a form field tree.
#[derive(Debug, Clone, PartialEq)]
pub enum FormField {
    Value(Value),
    File(FilePart),
    List(Vec<FormField>),
    Map(IndexMap<String, FormField>),
}

impl From<Value> for FormField {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(items) => FormField::List(items.into_iter().map(Into::into).collect()),
            Value::Object(fields) => FormField::Map(
                fields
                    .into_iter()
                    .map(|(key, value)| (key, value.into()))
                    .collect(),
            ),
            scalar => FormField::Value(scalar),
        }
    }
}

impl From<FilePart> for FormField {
    fn from(file: FilePart) -> Self {
        FormField::File(file)
    }
}

/// Ordered multipart fields. Repeated names are kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormData {
    fields: Vec<(String, FormValue)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds form data from top-level fields.
    ///
    /// With `flatten`, arrays and objects are expanded recursively into
    /// bracketed names. Without it every top-level field becomes one form
    /// field, non-scalar values encoded as JSON text.
    pub fn from_fields(fields: IndexMap<String, FormField>, flatten: bool) -> Self {
        let mut form = Self::new();
        for (key, field) in fields {
            if flatten {
                form.append_flattened(key, field);
            } else {
                form.append_raw(key, field);
            }
        }
        form
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.append_text(name, value);
        self
    }

    pub fn file(mut self, name: impl Into<String>, file: FilePart) -> Self {
        self.append_file(name, file);
        self
    }

    pub fn append_text(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields
            .push((name.into(), FormValue::Text(value.into())));
    }

    pub fn append_file(&mut self, name: impl Into<String>, file: FilePart) {
        self.fields.push((name.into(), FormValue::File(file)));
    }

    pub fn fields(&self) -> &[(String, FormValue)] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Converts into a reqwest multipart form.
    pub fn into_multipart(self) -> Result<reqwest::multipart::Form, reqwest::Error> {
        let mut form = reqwest::multipart::Form::new();
        for (name, value) in self.fields {
            form = match value {
                FormValue::Text(text) => form.text(name, text),
                FormValue::File(file) => {
                    let mut part = reqwest::multipart::Part::bytes(file.content.to_vec())
                        .file_name(file.file_name);
                    if let Some(mime) = file.mime {
                        part = part.mime_str(&mime)?;
                    }
                    form.part(name, part)
                }
            };
        }
        Ok(form)
    }

    fn append_flattened(&mut self, key: String, field: FormField) {
        match field {
            FormField::List(items) if items.is_empty() => self.append_text(key, ""),
            FormField::List(items) => {
                for (index, item) in items.into_iter().enumerate() {
                    self.append_flattened(format!("{key}[{index}]"), item);
                }
            }
            FormField::Map(fields) => {
                for (name, value) in fields {
                    self.append_flattened(format!("{key}[_obj][{name}]"), value);
                }
            }
            FormField::File(file) => self.append_file(key, file),
            FormField::Value(value) => self.append_text(key, scalar_text(&value)),
        }
    }

    fn append_raw(&mut self, key: String, field: FormField) {
        match field {
            FormField::File(file) => self.append_file(key, file),
            FormField::Value(value) => self.append_text(key, scalar_text(&value)),
            other => self.append_text(key, to_json(other).to_string()),
        }
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// JSON view of a field tree; files collapse to their file name.
fn to_json(field: FormField) -> Value {
    match field {
        FormField::Value(value) => value,
        FormField::File(file) => Value::String(file.file_name),
        FormField::List(items) => Value::Array(items.into_iter().map(to_json).collect()),
        FormField::Map(fields) => Value::Object(
            fields
                .into_iter()
                .map(|(key, value)| (key, to_json(value)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn names_and_texts(form: &FormData) -> Vec<(String, String)> {
        form.fields()
            .iter()
            .map(|(name, value)| {
                let value = match value {
                    FormValue::Text(text) => text.clone(),
                    FormValue::File(file) => format!("file:{}", file.file_name),
                };
                (name.clone(), value)
            })
            .collect()
    }

    fn fields(value: Value) -> IndexMap<String, FormField> {
        match FormField::from(value) {
            FormField::Map(fields) => fields,
            _ => unreachable!(),
        }
    }

    #[test]
    fn flattens_nested_arrays_and_objects() {
        let form = FormData::from_fields(
            fields(json!({
                "title": "doc",
                "tags": ["a", "b"],
                "rows": [{"id": 1, "labels": ["x"]}],
                "owner": {"name": "Jo", "age": null},
                "empty": [],
                "matrix": [[1, 2]]
            })),
            true,
        );

        assert_eq!(
            names_and_texts(&form),
            vec![
                ("title".into(), "doc".into()),
                ("tags[0]".into(), "a".into()),
                ("tags[1]".into(), "b".into()),
                ("rows[0][_obj][id]".into(), "1".into()),
                ("rows[0][_obj][labels][0]".into(), "x".into()),
                ("owner[_obj][name]".into(), "Jo".into()),
                ("owner[_obj][age]".into(), "null".into()),
                ("empty".into(), "".into()),
                ("matrix[0][0]".into(), "1".into()),
                ("matrix[0][1]".into(), "2".into()),
            ]
        );
    }

    #[test]
    fn flattening_keeps_files() {
        let mut tree = fields(json!({"note": "n"}));
        tree.insert(
            "attachments".into(),
            FormField::List(vec![FilePart::new("a.pdf", &b"%PDF"[..]).into()]),
        );

        let form = FormData::from_fields(tree, true);
        assert_eq!(
            names_and_texts(&form),
            vec![
                ("note".into(), "n".into()),
                ("attachments[0]".into(), "file:a.pdf".into()),
            ]
        );
    }

    #[test]
    fn unflattened_fields_are_json_encoded() {
        let form = FormData::from_fields(
            fields(json!({"name": "x", "count": 3, "tags": ["a"], "meta": {"k": true}})),
            false,
        );

        assert_eq!(
            names_and_texts(&form),
            vec![
                ("name".into(), "x".into()),
                ("count".into(), "3".into()),
                ("tags".into(), r#"["a"]"#.into()),
                ("meta".into(), r#"{"k":true}"#.into()),
            ]
        );
    }
}
