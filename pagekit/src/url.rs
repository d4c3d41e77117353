//! Request URL resolution.

use regex::{NoExpand, RegexBuilder};
use serde_json::{Map, Value};

use crate::config::ConfigError;
use pagekit_core::Endpoint;

/// Substitutes every `<%=key%>` placeholder of `template` with the matching
/// value of `data`. Keys match case-insensitively.
pub fn url_from_template(template: &str, data: Option<&Map<String, Value>>) -> Result<String, ConfigError> {
    if template.is_empty() {
        return Err(ConfigError::EmptyTemplate);
    }
    let mut url = template.to_string();
    for (key, value) in data.into_iter().flatten() {
        let placeholder = RegexBuilder::new(&format!("<%={}%>", regex::escape(key)))
            .case_insensitive(true)
            .build()?;
        let value = value_text(value);
        url = placeholder.replace_all(&url, NoExpand(&value)).into_owned();
    }
    Ok(url)
}

/// Returns `endpoint` with its final URL.
///
/// A template is filled from `data` and prefixed with `base_site`. A literal
/// URL is prefixed with `base_site` unless it is already absolute.
pub fn resolve_endpoint(
    endpoint: &Endpoint,
    data: Option<&Map<String, Value>>,
    base_site: &str,
) -> Result<Endpoint, ConfigError> {
    let mut resolved = endpoint.clone();
    if let Some(template) = &endpoint.template {
        resolved.url = format!("{base_site}{}", url_from_template(template, data)?);
        resolved.template = None;
    } else if !is_absolute(&endpoint.url) {
        resolved.url = format!("{base_site}{}", endpoint.url);
    }
    Ok(resolved)
}

/// Appends `params` as a raw query string. Values are not encoded.
pub fn append_params(url: &str, params: Option<&Map<String, Value>>) -> String {
    let Some(params) = params.filter(|params| !params.is_empty()) else {
        return url.to_string();
    };
    let separator = if url.contains('?') { '&' } else { '?' };
    let query = params
        .iter()
        .map(|(key, value)| format!("{key}={}", value_text(value)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{url}{separator}{query}")
}

pub(crate) fn is_absolute(url: &str) -> bool {
    let lower = url.get(..8).unwrap_or(url).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

pub(crate) fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Array(items) => items.iter().map(value_text).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_template_substitution_ignores_case() {
        let data = map(json!({"id": 5, "Section": "reports"}));
        let url = url_from_template("/api/<%=SECTION%>/<%=id%>/<%=Id%>/", Some(&data)).unwrap();
        assert_eq!(url, "/api/reports/5/5/");
    }

    #[test]
    fn test_template_without_data_is_kept() {
        assert_eq!(url_from_template("/api/<%=id%>/", None).unwrap(), "/api/<%=id%>/");
    }

    #[test]
    fn test_empty_template_is_an_error() {
        assert!(matches!(url_from_template("", None), Err(ConfigError::EmptyTemplate)));
        let endpoint = Endpoint::from_template("");
        assert!(resolve_endpoint(&endpoint, None, "https://x.org").is_err());
    }

    #[test]
    fn test_template_value_is_inserted_literally() {
        let data = map(json!({"q": "$1"}));
        assert_eq!(url_from_template("/s/<%=q%>", Some(&data)).unwrap(), "/s/$1");
    }

    #[test]
    fn test_resolve_endpoint_prefixes_origin() {
        let site = "https://example.org";
        let relative = resolve_endpoint(&Endpoint::new("/api/x/"), None, site).unwrap();
        assert_eq!(relative.url, "https://example.org/api/x/");

        let absolute = resolve_endpoint(&Endpoint::new("https://other.org/api/"), None, site).unwrap();
        assert_eq!(absolute.url, "https://other.org/api/");

        let data = map(json!({"id": 7}));
        let templated =
            resolve_endpoint(&Endpoint::from_template("/api/<%=id%>/"), Some(&data), site).unwrap();
        assert_eq!(templated.url, "https://example.org/api/7/");
        assert_eq!(templated.template, None);
    }

    #[test]
    fn test_append_params() {
        let params = map(json!({"page": 2, "search": "a b"}));
        assert_eq!(append_params("/api/x/", Some(&params)), "/api/x/?page=2&search=a b");
        assert_eq!(
            append_params("/api/x/?a=1", Some(&params)),
            "/api/x/?a=1&page=2&search=a b"
        );
        assert_eq!(append_params("/api/x/", Some(&Map::new())), "/api/x/");
        assert_eq!(append_params("/api/x/", None), "/api/x/");
    }
}
