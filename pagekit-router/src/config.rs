use serde::{Deserialize, Serialize};

use crate::RouterError;

/// Named redirect targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectPath {
    NotFound,
    Default,
}

/// Paths the application redirects to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedirectPaths {
    pub not_found: String,
    pub default: String,
}

impl Default for RedirectPaths {
    fn default() -> Self {
        Self {
            not_found: "/not-found".to_string(),
            default: "/".to_string(),
        }
    }
}

impl RedirectPaths {
    pub fn get(&self, path: RedirectPath) -> &str {
        match path {
            RedirectPath::NotFound => &self.not_found,
            RedirectPath::Default => &self.default,
        }
    }

    pub fn set(&mut self, path: RedirectPath, value: impl Into<String>) {
        match path {
            RedirectPath::NotFound => self.not_found = value.into(),
            RedirectPath::Default => self.default = value.into(),
        }
    }
}

/// Settings applied by [`Router::init`](crate::Router::init).
///
/// ```yaml
/// base_url: /pmp/
/// redirect_paths:
///   not_found: /pmp/not-found
///   default: /pmp/interventions/list
/// redirected_paths_to_subpage_lists: [interventions, partners]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Prefix of every application path.
    pub base_url: String,
    pub redirect_paths: RedirectPaths,
    /// Top level pages that redirect to their `/list` subpage.
    pub redirected_paths_to_subpage_lists: Vec<String>,
}

impl RouterConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, RouterError> {
        serde_saphyr::from_str(yaml).map_err(|err| RouterError::Config(err.to_string()))
    }
}
