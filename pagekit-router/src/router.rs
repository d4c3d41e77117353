use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use pagekit_core::EventBus;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::{RedirectPath, RedirectPaths, RouterConfig};
use crate::decode::{decode_component, decode_uri};
use crate::history::{History, MemoryHistory};
use crate::navigation::POPSTATE_EVENT;
use crate::RouterError;

/// Decoded query string parameters, in order of appearance.
pub type QueryParams = IndexMap<String, String>;

/// What a route handler receives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteCallbackParams {
    /// Whole match followed by every capture group, percent-decoded.
    /// Groups that did not participate in the match are empty.
    pub match_details: Vec<String>,
    pub query_params: QueryParams,
}

/// Route description built by a route handler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDetails {
    pub route_name: String,
    pub sub_route_name: Option<String>,
    pub sub_sub_route_name: Option<String>,
    pub path: String,
    pub query_params: Option<QueryParams>,
    pub params: Option<IndexMap<String, String>>,
}

/// Builds [`RouteDetails`] for a matched path.
pub type RouteHandler = Arc<dyn Fn(RouteCallbackParams) -> RouteDetails + Send + Sync>;

/// What a route matches against.
#[derive(Debug, Clone)]
pub enum RoutePattern {
    Regex(Regex),
    /// Matches every path with a single empty match detail.
    CatchAll,
}

impl RoutePattern {
    pub fn new(pattern: &str) -> Result<Self, RouterError> {
        Ok(Self::Regex(Regex::new(pattern)?))
    }

    /// Regex source, empty for [`RoutePattern::CatchAll`].
    pub fn source(&self) -> &str {
        match self {
            RoutePattern::Regex(regex) => regex.as_str(),
            RoutePattern::CatchAll => "",
        }
    }

    fn same_as(&self, other: &RoutePattern) -> bool {
        match (self, other) {
            (RoutePattern::Regex(a), RoutePattern::Regex(b)) => a.as_str() == b.as_str(),
            (RoutePattern::CatchAll, RoutePattern::CatchAll) => true,
            _ => false,
        }
    }

    fn match_details(&self, path: &str) -> Option<Vec<String>> {
        match self {
            RoutePattern::CatchAll => Some(vec![String::new()]),
            RoutePattern::Regex(regex) => regex.captures(path).map(|captures| {
                captures
                    .iter()
                    .map(|group| group.map(|m| decode_component(m.as_str())).unwrap_or_default())
                    .collect()
            }),
        }
    }
}

impl From<Regex> for RoutePattern {
    fn from(regex: Regex) -> Self {
        RoutePattern::Regex(regex)
    }
}

struct Route {
    pattern: RoutePattern,
    handler: RouteHandler,
}

/// Ordered route table over a [`History`].
///
/// Routes are tested in registration order and the first match wins.
/// Navigation helpers mutate the history and, for the `*_app_location`
/// variants, fire a `popstate` event on the [`EventBus`] so listeners can
/// react to the new location.
///
/// ```
/// use pagekit_router::{RouteDetails, RoutePattern, Router};
///
/// let mut router = Router::default();
/// router.add_route(RoutePattern::new(r"^interventions/(\d+)/(\w+)$").unwrap(), |params| {
///     RouteDetails {
///         route_name: "interventions".into(),
///         sub_route_name: Some(params.match_details[2].clone()),
///         path: params.match_details[0].clone(),
///         params: Some([("id".to_string(), params.match_details[1].clone())].into()),
///         ..Default::default()
///     }
/// });
///
/// let details = router.route_details(Some("/interventions/7/details/")).unwrap();
/// assert_eq!(details.sub_route_name.as_deref(), Some("details"));
/// ```
pub struct Router {
    routes: Vec<Route>,
    base_url: String,
    redirect_paths: RedirectPaths,
    redirected_paths_to_subpage_lists: Vec<String>,
    history: Arc<dyn History>,
    events: EventBus,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field(
                "routes",
                &self.routes.iter().map(|route| route.pattern.source()).collect::<Vec<_>>(),
            )
            .field("base_url", &self.base_url)
            .field("redirect_paths", &self.redirect_paths)
            .finish()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new(MemoryHistory::default(), EventBus::default())
    }
}

impl Router {
    pub fn new<H: History + 'static>(history: H, events: EventBus) -> Self {
        Self {
            routes: Vec::new(),
            base_url: "/".to_string(),
            redirect_paths: RedirectPaths::default(),
            redirected_paths_to_subpage_lists: Vec::new(),
            history: Arc::new(history),
            events,
        }
    }

    /// Removes one trailing slash, then one leading slash.
    pub fn clear_start_end_slashes(path: &str) -> &str {
        let path = path.strip_suffix('/').unwrap_or(path);
        path.strip_prefix('/').unwrap_or(path)
    }

    /// Applies `config`. The base URL is normalized to `/segment/`.
    pub fn init(&mut self, config: RouterConfig) {
        self.base_url = match config.base_url.as_str() {
            "" | "/" => "/".to_string(),
            base_url => format!("/{}/", Self::clear_start_end_slashes(base_url)),
        };
        self.redirect_paths = config.redirect_paths;
        self.redirected_paths_to_subpage_lists = config.redirected_paths_to_subpage_lists;
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn redirect_path(&self, path: RedirectPath) -> &str {
        self.redirect_paths.get(path)
    }

    pub fn set_redirect_path(&mut self, path: RedirectPath, value: impl Into<String>) {
        self.redirect_paths.set(path, value);
    }

    pub fn redirected_paths_to_subpage_lists(&self) -> &[String] {
        &self.redirected_paths_to_subpage_lists
    }

    pub fn set_redirected_paths_to_subpage_lists(&mut self, paths: Vec<String>) {
        self.redirected_paths_to_subpage_lists = paths;
    }

    /// Returns `true` if a route with the same pattern is registered.
    pub fn is_route_added(&self, pattern: &RoutePattern) -> bool {
        self.routes.iter().any(|route| route.pattern.same_as(pattern))
    }

    /// Registers `handler` for `pattern`. A pattern that is already
    /// registered keeps its first handler.
    pub fn add_route<P, F>(&mut self, pattern: P, handler: F) -> &mut Self
    where
        P: Into<RoutePattern>,
        F: Fn(RouteCallbackParams) -> RouteDetails + Send + Sync + 'static,
    {
        let pattern = pattern.into();
        if self.is_route_added(&pattern) {
            debug!(pattern = pattern.source(), "Route already added");
        } else {
            self.routes.push(Route {
                pattern,
                handler: Arc::new(handler),
            });
        }
        self
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Application path of `path`, or of the current location: base URL and
    /// one trailing slash removed.
    pub fn location_path(&self, path: Option<&str>) -> String {
        let path = match path.filter(|path| !path.is_empty()) {
            Some(path) => path.to_string(),
            None => decode_uri(&self.history.location()),
        };
        let path = path.strip_prefix(self.base_url.as_str()).unwrap_or(&path);
        path.strip_suffix('/').unwrap_or(path).to_string()
    }

    /// `{base_url}{page}/list` when `path` is a single segment page that
    /// redirects to its list subpage.
    pub fn redirect_to_list_path(&self, path: &str) -> Option<String> {
        let path = self.location_path(Some(path));
        let mut segments = path.split('/');
        match (segments.next(), segments.next()) {
            (Some(page), None)
                if self
                    .redirected_paths_to_subpage_lists
                    .iter()
                    .any(|listed| listed == page) =>
            {
                Some(format!("{}{page}/list", self.base_url))
            }
            _ => None,
        }
    }

    /// Details built by the first route matching `path`, or the current
    /// location.
    pub fn route_details(&self, path: Option<&str>) -> Option<RouteDetails> {
        let location = self.location_path(path);
        let (location, query) = match location.split_once('?') {
            Some((location, query)) => (location, query),
            None => (location.as_str(), ""),
        };

        for route in &self.routes {
            if let Some(match_details) = route.pattern.match_details(location) {
                debug!(path = location, pattern = route.pattern.source(), "Route matched");
                return Some((route.handler)(RouteCallbackParams {
                    match_details,
                    query_params: decode_query(query),
                }));
            }
        }
        debug!(path = location, "No route matched");
        None
    }

    /// `path` prefixed with the base URL unless it already contains it.
    pub fn prepare_location_path(&self, path: &str) -> String {
        if path.contains(self.base_url.as_str()) {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, Self::clear_start_end_slashes(path))
        }
    }

    /// Returns `true` unless `details` describe the given route.
    pub fn page_is_not_currently_active(
        details: Option<&RouteDetails>,
        route_name: &str,
        sub_route_name: Option<&str>,
        sub_sub_route_name: Option<&str>,
    ) -> bool {
        let Some(details) = details else {
            return true;
        };
        let is_active = details.route_name == route_name
            && details.sub_route_name.as_deref() == sub_route_name
            && sub_sub_route_name.is_none_or(|name| details.sub_sub_route_name.as_deref() == Some(name));
        !is_active
    }

    /// Adds a history entry for `path` and `query`. Without a path, the
    /// current path is kept.
    pub fn push_state(&self, path: Option<&str>, query: Option<&str>) -> &Self {
        self.history.push_state(&self.history_url(path, query));
        self
    }

    /// Replaces the current history entry with `path` and `query`.
    pub fn replace_state(&self, path: Option<&str>, query: Option<&str>) -> &Self {
        self.history.replace_state(&self.history_url(path, query));
        self
    }

    /// Pushes `location` and fires `popstate`.
    pub fn update_app_location(&self, location: &str, query: Option<&str>) {
        self.push_state(Some(location), query);
        self.events.fire(POPSTATE_EVENT, Value::Null);
    }

    /// Replaces the current entry with `location` and fires `popstate`.
    pub fn replace_app_location(&self, location: &str, query: Option<&str>) {
        self.replace_state(Some(location), query);
        self.events.fire(POPSTATE_EVENT, Value::Null);
    }

    fn history_url(&self, path: Option<&str>, query: Option<&str>) -> String {
        let path = match path.filter(|path| !path.is_empty()) {
            Some(path) => self.prepare_location_path(path),
            None => {
                let location = self.history.location();
                location.split('?').next().unwrap_or_default().to_string()
            }
        };
        match query.filter(|query| !query.is_empty()) {
            Some(query) => format!("{path}?{query}"),
            None => path,
        }
    }
}

/// Splits `a=1&b=2` into decoded pairs. A repeated key keeps its last value.
pub fn decode_query(query: &str) -> QueryParams {
    let mut params = QueryParams::new();
    if query.is_empty() {
        return params;
    }
    for pair in query.split('&') {
        let mut parts = pair.split('=');
        let key = parts.next().unwrap_or_default();
        let value = parts.next().map(decode_component).unwrap_or_default();
        params.insert(key.to_string(), value);
    }
    params
}
