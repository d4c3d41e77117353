//! Request header resolution.
//!
//! Headers are layered in this order, later layers overriding earlier ones:
//!
//! 1. `content-type` guessed from the body
//! 2. `language` for same-origin URLs
//! 3. caller headers
//! 4. `authorization` for endpoints with a `token_key`
//! 5. `x-csrftoken` for unsafe methods

use http::Method;
use indexmap::IndexMap;
use pagekit_http::Body;
use percent_encoding::percent_decode_str;

pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
pub const JSON: &str = "application/json";

/// Methods that never carry a CSRF token.
pub fn csrf_safe_method(method: &Method) -> bool {
    matches!(method.as_str(), "GET" | "HEAD" | "OPTIONS" | "TRACE")
}

/// Content type implied by `body`, `None` for multipart forms.
pub fn content_type_for(body: &Body) -> Option<&'static str> {
    match body {
        Body::Text(_) => Some(FORM_URLENCODED),
        Body::Form(_) => None,
        _ => Some(JSON),
    }
}

/// Reads cookie `name` from a `Cookie` header string, percent-decoded.
pub fn cookie_value(cookies: &str, name: &str) -> Option<String> {
    cookies
        .split(';')
        .map(str::trim)
        .find_map(|cookie| cookie.strip_prefix(name)?.strip_prefix('='))
        .map(|raw| percent_decode_str(raw).decode_utf8_lossy().into_owned())
}

/// Returns `true` if `language` should be sent to `url`.
pub fn sends_language(url: &str, base_site: &str) -> bool {
    url.starts_with('/') || (!base_site.is_empty() && url.starts_with(base_site))
}

/// Assembles headers from their layers.
pub(crate) struct HeaderLayers<'a> {
    pub body: &'a Body,
    pub url: &'a str,
    pub base_site: &'a str,
    pub language: Option<&'a str>,
    pub caller: &'a IndexMap<String, String>,
    pub token: Option<String>,
    pub csrf_token: Option<String>,
}

impl HeaderLayers<'_> {
    pub fn resolve(self) -> IndexMap<String, String> {
        let mut headers = IndexMap::new();
        if let Some(content_type) = content_type_for(self.body) {
            headers.insert("content-type".to_string(), content_type.to_string());
        }
        if let Some(language) = self.language
            && sends_language(self.url, self.base_site)
        {
            headers.insert("language".to_string(), language.to_string());
        }
        for (name, value) in self.caller {
            headers.insert(name.clone(), value.clone());
        }
        if let Some(token) = self.token {
            headers.insert("authorization".to_string(), format!("JWT {token}"));
        }
        if let Some(csrf_token) = self.csrf_token {
            headers.insert("x-csrftoken".to_string(), csrf_token);
        }
        headers
    }
}
