//! Cache-then-network request client.

use std::sync::Arc;

use pagekit_backend::{Backend, CacheStore, CacheStoreBuilder};
use pagekit_core::{Clock, Endpoint, EventBus, Payload};
use pagekit_http::{ActiveRequests, HttpRequest, RequestError, RequestOptions};
use serde_json::{Map, Value};
use tracing::{debug, error, instrument, warn};

use crate::config::{ClientConfig, ConfigError};
use crate::headers::{HeaderLayers, cookie_value, csrf_safe_method};
use crate::hooks::{CookieSource, CredentialStore, MemoryCredentialStore, TokenProvider};
use crate::request::RequestConfig;
use crate::url::{append_params, resolve_endpoint};

/// Event fired once local storage has been refreshed.
pub const REFRESH_EVENT: &str = "refresh";

struct Inner {
    http: reqwest::Client,
    config: ClientConfig,
    cache: CacheStore,
    token_provider: Option<Arc<dyn TokenProvider>>,
    credentials: Arc<dyn CredentialStore>,
    cookies: Option<Arc<dyn CookieSource>>,
    active: ActiveRequests,
    events: EventBus,
}

/// Request orchestrator.
///
/// Cacheable GET requests are answered from the [`CacheStore`] when a fresh
/// entry exists; otherwise the request goes to the network and the response
/// is written back to the cache. Every other request goes straight to the
/// network. Clones share configuration, cache and active requests.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.inner.config)
            .field("cache", &self.inner.cache)
            .field("active", &self.inner.active.len())
            .finish()
    }
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn cache(&self) -> &CacheStore {
        &self.inner.cache
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    pub fn active_requests(&self) -> &ActiveRequests {
        &self.inner.active
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.inner.credentials
    }

    /// Resolves the configured endpoint `name`, filling its template from `data`.
    pub fn endpoint(
        &self,
        name: &str,
        data: Option<&Map<String, Value>>,
    ) -> Result<Endpoint, ConfigError> {
        let endpoint = self.inner.config.endpoint(name)?;
        resolve_endpoint(endpoint, data, self.inner.config.base_site())
    }

    /// Sends a request, going through the cache when the endpoint allows it.
    ///
    /// With a `key`, the request is registered as active until it finishes and
    /// can be cancelled through [`abort_request_by_key`](Self::abort_request_by_key).
    #[instrument(skip_all, fields(method = %config.method, endpoint = %config.endpoint.url))]
    pub async fn execute(
        &self,
        config: RequestConfig,
        key: Option<&str>,
    ) -> Result<Payload, RequestError> {
        let endpoint = resolve_endpoint(
            &config.endpoint,
            config.template_data.as_ref(),
            self.inner.config.base_site(),
        )
        .map_err(|err| RequestError::configuration(err.to_string()))?;
        let method = config.method.clone();
        let options = self.request_options(config, &endpoint).await;

        let cache = &self.inner.cache;
        if !cache.is_cacheable(Some(&method), &endpoint) {
            return self.dispatch(options, key).await;
        }
        if let Ok(data) = cache.read(&endpoint).await {
            debug!(url = %endpoint.url, "Response served from cache");
            return Ok(data);
        }
        let data = self.dispatch(options, key).await?;
        Ok(cache.write(data, &endpoint).await)
    }

    /// Aborts the active request registered under `key`.
    ///
    /// Logs a warning when `key` is empty or no request is registered under it.
    pub fn abort_request_by_key(&self, key: &str) {
        self.inner.active.abort(key);
    }

    /// Aborts the active requests registered under `keys`, or all of them.
    /// Unknown keys are skipped silently.
    pub fn abort_active_requests(&self, keys: Option<&[&str]>) {
        match keys {
            None => self.inner.active.abort_all(),
            Some(keys) => {
                for key in keys.iter().filter(|key| self.inner.active.contains(key)) {
                    self.inner.active.abort(key);
                }
            }
        }
    }

    /// Clears every storage backend, then the credential store, then fires
    /// [`REFRESH_EVENT`].
    pub async fn refresh_storage(&self) {
        if let Err(error) = self.inner.cache.clear().await {
            error!(%error, "Could not clear local databases");
        }
        self.inner.credentials.clear();
        self.inner.events.fire(REFRESH_EVENT, Value::Null);
    }

    pub(crate) async fn request_options(
        &self,
        config: RequestConfig,
        endpoint: &Endpoint,
    ) -> RequestOptions {
        let url = append_params(&endpoint.url, config.params.as_ref());
        let token = self.token(endpoint.token_key.as_deref()).await;
        let csrf_token = if config.csrf_check && !csrf_safe_method(&config.method) {
            self.csrf_token()
        } else {
            None
        };
        let headers = HeaderLayers {
            body: &config.body,
            url: &url,
            base_site: self.inner.config.base_site(),
            language: self.inner.config.language.as_deref(),
            caller: &config.headers,
            token,
            csrf_token,
        }
        .resolve();

        RequestOptions {
            method: config.method,
            url,
            headers,
            body: config.body,
            timeout: config.timeout.unwrap_or(self.inner.config.timeout),
            handle_as: config.handle_as,
            with_credentials: config.with_credentials,
            reject_with_request: config.reject_with_request,
            json_prefix: config.json_prefix,
        }
    }

    pub(crate) async fn dispatch(
        &self,
        options: RequestOptions,
        key: Option<&str>,
    ) -> Result<Payload, RequestError> {
        let request = HttpRequest::with_events(self.inner.http.clone(), self.inner.events.clone());
        let pending = request
            .send(options)
            .ok_or_else(|| RequestError::configuration("Request was already sent"))?;
        // Registered only once sending, so an abort by key lands as `Aborted`.
        let _registration = key
            .filter(|key| !key.is_empty())
            .map(|key| self.inner.active.register(key, request.clone()));
        Ok(pending.await?.into_payload())
    }

    /// Bearer token for `token_key`, preferring the token provider.
    pub(crate) async fn token(&self, token_key: Option<&str>) -> Option<String> {
        let key = token_key.filter(|key| !key.is_empty())?;
        let stored = self.inner.credentials.get(key);
        let Some(provider) = &self.inner.token_provider else {
            return stored;
        };
        match provider.acquire_token().await {
            Ok(token) => Some(token),
            Err(error) => {
                warn!(%error, "Failed to acquire token, using stored token");
                stored
            }
        }
    }

    pub(crate) fn csrf_token(&self) -> Option<String> {
        let cookies = self.inner.cookies.as_ref()?.cookies()?;
        cookie_value(&cookies, &self.inner.config.csrf_cookie_name)
    }

    pub(crate) fn base_site(&self) -> &str {
        self.inner.config.base_site()
    }
}

/// Builder for [`Client`].
pub struct ClientBuilder {
    http: Option<reqwest::Client>,
    config: ClientConfig,
    cache: CacheStoreBuilder,
    token_provider: Option<Arc<dyn TokenProvider>>,
    credentials: Option<Arc<dyn CredentialStore>>,
    cookies: Option<Arc<dyn CookieSource>>,
    events: Option<EventBus>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            http: None,
            config: ClientConfig::default(),
            cache: CacheStore::builder(),
            token_provider: None,
            credentials: None,
            cookies: None,
            events: None,
        }
    }
}

impl ClientBuilder {
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn request_db<B: Backend + 'static>(mut self, backend: B) -> Self {
        self.cache = self.cache.request_db(backend);
        self
    }

    pub fn shared_db<B: Backend + 'static>(mut self, backend: B) -> Self {
        self.cache = self.cache.shared_db(backend);
        self
    }

    pub fn clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.cache = self.cache.clock(clock);
        self
    }

    pub fn token_provider<T: TokenProvider + 'static>(mut self, provider: T) -> Self {
        self.token_provider = Some(Arc::new(provider));
        self
    }

    pub fn credentials<S: CredentialStore + 'static>(mut self, store: S) -> Self {
        self.credentials = Some(Arc::new(store));
        self
    }

    pub fn cookies<C: CookieSource + 'static>(mut self, cookies: C) -> Self {
        self.cookies = Some(Arc::new(cookies));
        self
    }

    pub fn events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn build(self) -> Client {
        let cache = self.cache.disabled(self.config.cache_disabled).build();
        let credentials = self
            .credentials
            .unwrap_or_else(|| Arc::new(MemoryCredentialStore::new()));
        Client {
            inner: Arc::new(Inner {
                http: self.http.unwrap_or_default(),
                config: self.config,
                cache,
                token_provider: self.token_provider,
                credentials,
                cookies: self.cookies,
                active: ActiveRequests::new(),
                events: self.events.unwrap_or_default(),
            }),
        }
    }
}
