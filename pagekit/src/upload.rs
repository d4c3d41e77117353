//! File upload helper.

use http::Method;
use indexmap::IndexMap;
use pagekit_core::Payload;
use pagekit_http::{FilePart, FormData, RequestError, RequestOptions, ResponseType};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Client;
use crate::url::{is_absolute, value_text};

/// Field the file is sent under unless configured otherwise.
pub const DEFAULT_FILE_FIELD: &str = "file";

/// Where and how [`Client::upload`] sends a file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub upload_endpoint: String,
    /// Overrides `upload_endpoint` when non-empty.
    pub endpoint: Option<String>,
    /// Form field the file is sent under.
    pub file_field: Option<String>,
    /// Extra text fields appended after the file.
    pub extra_fields: IndexMap<String, Value>,
    /// Defaults to POST.
    pub method: Option<String>,
    /// Credential store key of the bearer token.
    pub token_key: Option<String>,
}

impl UploadConfig {
    pub fn new(upload_endpoint: impl Into<String>) -> Self {
        Self {
            upload_endpoint: upload_endpoint.into(),
            ..Self::default()
        }
    }

    pub fn file_field(mut self, name: impl Into<String>) -> Self {
        self.file_field = Some(name.into());
        self
    }

    pub fn extra_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.extra_fields.insert(name.into(), value);
        self
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn token_key(mut self, key: impl Into<String>) -> Self {
        self.token_key = Some(key.into());
        self
    }

    fn url(&self) -> &str {
        self.endpoint
            .as_deref()
            .filter(|endpoint| !endpoint.is_empty())
            .unwrap_or(&self.upload_endpoint)
    }
}

impl Client {
    /// Uploads `file` as multipart form data.
    ///
    /// The request carries the CSRF token when the cookie is present and a
    /// `JWT` authorization header when `token_key` is set. It is registered as
    /// active under the file name. Text responses are parsed as JSON when
    /// possible.
    pub async fn upload(&self, config: &UploadConfig, file: FilePart) -> Result<Payload, RequestError> {
        let method = match config.method.as_deref() {
            None | Some("") => Method::POST,
            Some(method) => Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                .map_err(|err| RequestError::configuration(err.to_string()))?,
        };
        let url = match config.url() {
            url if is_absolute(url) => url.to_string(),
            url => format!("{}{}", self.base_site(), url),
        };

        let mut headers = IndexMap::new();
        if let Some(csrf_token) = self.csrf_token() {
            headers.insert("x-csrftoken".to_string(), csrf_token);
        }
        if let Some(token) = self.token(config.token_key.as_deref()).await {
            headers.insert("authorization".to_string(), format!("JWT {token}"));
        }

        let key = file.file_name.clone();
        let field = config
            .file_field
            .as_deref()
            .filter(|field| !field.is_empty())
            .unwrap_or(DEFAULT_FILE_FIELD);
        let mut form = FormData::new().file(field, file);
        for (name, value) in &config.extra_fields {
            form.append_text(name, value_text(value));
        }

        let options = RequestOptions::new(method, url)
            .headers(headers)
            .body(form)
            .timeout(self.config().timeout)
            .handle_as(ResponseType::Text)
            .reject_with_request(true);
        let payload = self.dispatch(options, Some(&key)).await?;
        Ok(match payload {
            Payload::Text(text) => serde_json::from_str(&text)
                .map(Payload::Json)
                .unwrap_or(Payload::Text(text)),
            other => other,
        })
    }
}
