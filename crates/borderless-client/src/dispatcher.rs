//! Request dispatcher.
//!
//! The [`Dispatcher`] issues exactly one logical HTTP request per call:
//!
//! - **URL building**: base URL, endpoint and (for non-body methods) a
//!   form-encoded query string in insertion order
//! - **Headers**: bearer authorization and JSON content type, overridden by
//!   per-call extra headers on name collision
//! - **Retries**: transport faults are retried with a fixed delay; responses
//!   are never retried, whatever their status
//! - **Decoding**: JSON by default, raw bytes when the call carries an
//!   `Accept` header
//! - **Errors**: non-2xx responses are classified into an [`ApiError`]
//!
//! The dispatcher keeps no per-call state, so one instance can serve many
//! concurrent callers.
//!
//! # Examples
//!
//! ```no_run
//! use borderless_client::Dispatcher;
//! use borderless_common::{ClientConfig, RequestSpec};
//!
//! # async fn example() -> borderless_client::Result<()> {
//! let dispatcher = Dispatcher::new(ClientConfig::new("api-token"))?;
//!
//! let balances = dispatcher
//!     .get("v4/profiles/42/balances", &[("types", "STANDARD")])
//!     .await?;
//! println!("{balances}");
//!
//! let receipt = dispatcher
//!     .execute_raw(
//!         RequestSpec::get("v1/transfers/7/receipt.pdf").with_header("Accept", "application/pdf"),
//!     )
//!     .await?;
//! println!("{} bytes", receipt.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Security
//!
//! The API key is only ever exposed to build the `Authorization` header,
//! which is marked sensitive. It never appears in logs, errors or `Debug`
//! output.

use std::sync::Arc;
use std::time::Duration;

use borderless_common::{ApiResponse, ClientConfig, Method, RequestSpec};
use bytes::Bytes;
use log::{debug, error, warn};
use reqwest::header::{
    ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue,
};
use reqwest_middleware::{ClientWithMiddleware, Middleware};
use reqwest_retry::RetryTransientMiddleware;
use secrecy::ExposeSecret;
use serde_json::Value;
use url::form_urlencoded;

use crate::cache::{CacheStore, InMemoryCacheStore, ResponseCache, request_key};
use crate::error::{ClientError, Result, classify};
use crate::retry::{BufferedBody, TransportFaultStrategy, fixed_delay_policy};

/// Issues requests against the configured API host.
///
/// Cheap to clone; clones share the connection pool and the cache.
#[derive(Clone)]
pub struct Dispatcher {
    client: ClientWithMiddleware,
    single_attempt_client: ClientWithMiddleware,
    authorization: HeaderValue,
    config: Arc<ClientConfig>,
    cache: ResponseCache,
}

// Custom Debug implementation to avoid exposing the API key
impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.config.base_url)
            .field("timeout_seconds", &self.config.timeout_seconds)
            .field("proxy", &self.config.proxy.is_some())
            .field("retry", &self.config.retry)
            .finish_non_exhaustive()
    }
}

/// Builder for a [`Dispatcher`] with a custom cache store or extra middleware.
pub struct DispatcherBuilder {
    config: ClientConfig,
    cache_store: Option<Arc<dyn CacheStore>>,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl std::fmt::Debug for DispatcherBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatcherBuilder")
            .field("base_url", &self.config.base_url)
            .field("custom_cache_store", &self.cache_store.is_some())
            .field("middleware", &self.middleware.len())
            .finish_non_exhaustive()
    }
}

impl DispatcherBuilder {
    /// Uses `store` as the response cache backend.
    ///
    /// Defaults to an [`InMemoryCacheStore`].
    #[must_use]
    pub fn cache_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.cache_store = Some(store);
        self
    }

    /// Adds middleware that runs inside every attempt, after the retry layer.
    #[must_use]
    pub fn middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Builds the dispatcher.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] if the configuration is
    /// invalid or the HTTP client cannot be created.
    pub fn build(self) -> Result<Dispatcher> {
        let config = self.config;
        config
            .validate()
            .map_err(|e| ClientError::Configuration(e.to_string()))?;

        let mut authorization =
            HeaderValue::from_str(&format!("Bearer {}", config.api_key.expose_secret())).map_err(
                |_| {
                    ClientError::Configuration(
                        "API key contains characters not allowed in a header".to_string(),
                    )
                },
            )?;
        authorization.set_sensitive(true);

        let mut http_builder = reqwest::Client::builder().timeout(config.timeout());
        if let Some(proxy_url) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| ClientError::Configuration(format!("Invalid proxy: {e}")))?;
            http_builder = http_builder.proxy(proxy);
            debug!("Routing outbound requests through the configured proxy");
        }
        let http_client = http_builder
            .build()
            .map_err(|e| ClientError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        let retry_middleware = RetryTransientMiddleware::new_with_policy_and_strategy(
            fixed_delay_policy(&config.retry),
            TransportFaultStrategy,
        );

        // Bodies are read inside each attempt so truncated downloads are retried.
        let mut retrying = reqwest_middleware::ClientBuilder::new(http_client.clone())
            .with(retry_middleware)
            .with(BufferedBody);
        let mut single_attempt =
            reqwest_middleware::ClientBuilder::new(http_client).with(BufferedBody);
        for middleware in self.middleware {
            retrying = retrying.with_arc(Arc::clone(&middleware));
            single_attempt = single_attempt.with_arc(middleware);
        }

        debug!(
            "Dispatcher ready for {} (API version label {}, timeout {}s)",
            config.base_url, config.api_version, config.timeout_seconds
        );

        let store = self
            .cache_store
            .unwrap_or_else(|| Arc::new(InMemoryCacheStore::default()));

        Ok(Dispatcher {
            client: retrying.build(),
            single_attempt_client: single_attempt.build(),
            authorization,
            config: Arc::new(config),
            cache: ResponseCache::new(store),
        })
    }
}

impl Dispatcher {
    /// Creates a dispatcher with the default in-memory cache.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] if the configuration is invalid.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    /// Starts building a dispatcher for `config`.
    #[must_use]
    pub fn builder(config: ClientConfig) -> DispatcherBuilder {
        DispatcherBuilder {
            config,
            cache_store: None,
            middleware: Vec::new(),
        }
    }

    /// The configuration this dispatcher was built with.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The response cache shared by this dispatcher's cacheable calls.
    #[must_use]
    pub const fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Issues a `GET` and decodes the JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`] for non-2xx responses, or a transport
    /// error once the retry budget is spent.
    pub async fn get(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<Value> {
        self.execute_json(RequestSpec::get(endpoint).with_query_pairs(query.iter().copied()))
            .await
    }

    /// Issues a `GET` answered from the response cache while fresh.
    ///
    /// # Errors
    ///
    /// Same as [`Dispatcher::get`]; failures are never cached.
    pub async fn get_cached(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
        ttl: Duration,
    ) -> Result<Value> {
        self.execute_json(
            RequestSpec::get(endpoint)
                .with_query_pairs(query.iter().copied())
                .cached(ttl),
        )
        .await
    }

    /// Issues a `POST` with an optional JSON body.
    ///
    /// # Errors
    ///
    /// Same as [`Dispatcher::get`].
    pub async fn post(&self, endpoint: &str, body: Option<Value>) -> Result<Value> {
        self.execute_json(with_optional_body(RequestSpec::post(endpoint), body))
            .await
    }

    /// Issues a `PUT` with an optional JSON body.
    ///
    /// # Errors
    ///
    /// Same as [`Dispatcher::get`].
    pub async fn put(&self, endpoint: &str, body: Option<Value>) -> Result<Value> {
        self.execute_json(with_optional_body(RequestSpec::put(endpoint), body))
            .await
    }

    /// Issues a `PATCH` with an optional JSON body.
    ///
    /// # Errors
    ///
    /// Same as [`Dispatcher::get`].
    pub async fn patch(&self, endpoint: &str, body: Option<Value>) -> Result<Value> {
        self.execute_json(with_optional_body(RequestSpec::patch(endpoint), body))
            .await
    }

    /// Issues a `DELETE`.
    ///
    /// # Errors
    ///
    /// Same as [`Dispatcher::get`].
    pub async fn delete(&self, endpoint: &str) -> Result<Value> {
        self.execute_json(RequestSpec::delete(endpoint)).await
    }

    /// Executes `spec`, expecting a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidResponse`] if `spec` asked for the raw
    /// body, otherwise the same errors as [`Dispatcher::execute`].
    pub async fn execute_json(&self, spec: RequestSpec) -> Result<Value> {
        self.execute(spec).await?.into_json().ok_or_else(|| {
            ClientError::InvalidResponse("expected a JSON body, got raw bytes".to_string())
        })
    }

    /// Executes `spec`, expecting the raw body.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidResponse`] if `spec` carries no
    /// `Accept` header, otherwise the same errors as [`Dispatcher::execute`].
    pub async fn execute_raw(&self, spec: RequestSpec) -> Result<Bytes> {
        self.execute(spec).await?.into_bytes().ok_or_else(|| {
            ClientError::InvalidResponse(
                "expected a raw body; set an Accept header on the request".to_string(),
            )
        })
    }

    /// Executes one request.
    ///
    /// Cacheable GETs (see [`RequestSpec::is_cacheable`]) are answered from
    /// the cache while their entry is fresh.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Api`] for non-2xx responses
    /// - [`ClientError::Middleware`] / [`ClientError::Network`] for transport
    ///   faults that outlived the retry budget
    /// - [`ClientError::InvalidRequest`] for headers that cannot be encoded
    /// - [`ClientError::Serialization`] for a success body that is not JSON
    pub async fn execute(&self, spec: RequestSpec) -> Result<ApiResponse> {
        match spec.cache_ttl {
            Some(ttl) if spec.is_cacheable() => {
                let key = request_key(&spec.endpoint, &spec.query);
                let value = self
                    .cache
                    .get_or_compute(&key, ttl, || self.dispatch_json(&spec))
                    .await?;
                Ok(ApiResponse::Json(value))
            }
            _ => self.dispatch(&spec).await,
        }
    }

    async fn dispatch_json(&self, spec: &RequestSpec) -> Result<Value> {
        self.dispatch(spec).await?.into_json().ok_or_else(|| {
            ClientError::InvalidResponse("expected a JSON body, got raw bytes".to_string())
        })
    }

    async fn dispatch(&self, spec: &RequestSpec) -> Result<ApiResponse> {
        let url = build_url(&self.config.base_url, &spec.endpoint, spec.method, &spec.query);
        if spec.method.allows_body() && !spec.query.is_empty() {
            warn!(
                "Query parameters are not sent with {} requests; ignoring {} parameter(s) for {}",
                spec.method,
                spec.query.len(),
                spec.endpoint
            );
        }

        let headers = self.merged_headers(&spec.headers)?;
        let raw_body = headers.contains_key(ACCEPT);

        let mut request = self
            .client_for(spec.method)
            .request(http_method(spec.method), &url)
            .headers(headers);

        if spec.method.allows_body()
            && let Some(body) = &spec.body
        {
            request = request.body(serde_json::to_vec(body)?);
        }

        debug!("Dispatching {} {url}", spec.method);
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if status.is_success() {
            return decode_success(body, raw_body);
        }

        let payload = decode_error_body(&body);
        let api_error = classify(status.as_u16(), payload);
        error!(
            "{} {} failed with status {}: {}",
            spec.method,
            spec.endpoint,
            status.as_u16(),
            api_error.message
        );

        Err(api_error.into())
    }

    fn client_for(&self, method: Method) -> &ClientWithMiddleware {
        if self.config.retry.scope.covers(method) {
            &self.client
        } else {
            &self.single_attempt_client
        }
    }

    fn merged_headers(&self, extra: &[(String, String)]) -> Result<HeaderMap> {
        let mut headers = HeaderMap::with_capacity(2 + extra.len());
        headers.insert(AUTHORIZATION, self.authorization.clone());
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        for (name, value) in extra {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                ClientError::InvalidRequest(format!("Invalid header name '{name}': {e}"))
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| {
                ClientError::InvalidRequest(format!("Invalid value for header '{name}': {e}"))
            })?;
            headers.insert(header_name, header_value);
        }

        Ok(headers)
    }
}

fn with_optional_body(spec: RequestSpec, body: Option<Value>) -> RequestSpec {
    match body {
        Some(body) => spec.with_body(body),
        None => spec,
    }
}

const fn http_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

/// Builds the full URL for a request.
///
/// Query pairs are form-encoded in insertion order and appended only for
/// non-body methods. An endpoint that already carries a query string is
/// extended with `&`.
///
/// ```
/// use borderless_client::dispatcher::build_url;
/// use borderless_common::Method;
///
/// let url = build_url(
///     "https://api.wise.com/",
///     "v4/profiles/42/balances",
///     Method::Get,
///     &[("types".to_string(), "STANDARD".to_string())],
/// );
/// assert_eq!(url, "https://api.wise.com/v4/profiles/42/balances?types=STANDARD");
/// ```
#[must_use]
pub fn build_url(
    base_url: &str,
    endpoint: &str,
    method: Method,
    query: &[(String, String)],
) -> String {
    let mut url = format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    );

    if !method.allows_body() && !query.is_empty() {
        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(query)
            .finish();
        url.push(if url.contains('?') { '&' } else { '?' });
        url.push_str(&encoded);
    }

    url
}

fn decode_success(body: Bytes, raw_body: bool) -> Result<ApiResponse> {
    if raw_body {
        return Ok(ApiResponse::Raw(body));
    }
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ApiResponse::Json(Value::Null));
    }
    Ok(ApiResponse::Json(serde_json::from_slice(&body)?))
}

fn decode_error_body(body: &[u8]) -> Option<Value> {
    if body.is_empty() {
        return None;
    }
    match serde_json::from_slice(body) {
        Ok(payload) => Some(payload),
        Err(e) => {
            warn!("Error response body is not JSON ({e}); classifying without payload");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    use async_trait::async_trait;
    use borderless_common::{RetryConfig, RetryScope};
    use http::Extensions;
    use reqwest_middleware::Next;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::cache::NoopCacheStore;
    use crate::error::ApiErrorKind;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn create_test_config(base_url: &str) -> ClientConfig {
        ClientConfig::new("test-key").with_base_url(base_url)
    }

    /// Fails the first `failures` attempts with a transport-level error.
    struct FlakyTransport {
        failures: usize,
        attempts: Arc<AtomicUsize>,
    }

    impl FlakyTransport {
        fn new(failures: usize) -> (Arc<Self>, Arc<AtomicUsize>) {
            let attempts = Arc::new(AtomicUsize::new(0));
            let middleware = Arc::new(Self {
                failures,
                attempts: Arc::clone(&attempts),
            });
            (middleware, attempts)
        }
    }

    #[async_trait]
    impl Middleware for FlakyTransport {
        async fn handle(
            &self,
            req: reqwest::Request,
            extensions: &mut Extensions,
            next: Next<'_>,
        ) -> reqwest_middleware::Result<reqwest::Response> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < self.failures {
                return Err(reqwest_middleware::Error::middleware(
                    std::io::Error::other("connection reset by peer"),
                ));
            }
            next.run(req, extensions).await
        }
    }

    #[test]
    fn test_build_url_joins_and_encodes() {
        let query = vec![
            ("source".to_string(), "EUR".to_string()),
            ("note".to_string(), "a b&c".to_string()),
        ];
        assert_eq!(
            build_url("https://api.wise.com", "/v1/rates", Method::Get, &query),
            "https://api.wise.com/v1/rates?source=EUR&note=a+b%26c"
        );
        assert_eq!(
            build_url("https://api.wise.com/", "v1/rates", Method::Get, &[]),
            "https://api.wise.com/v1/rates"
        );
    }

    #[test]
    fn test_build_url_extends_existing_query() {
        let query = vec![("sourceAmount".to_string(), "1000".to_string())];
        assert_eq!(
            build_url(
                "https://api.wise.com",
                "v1/account-requirements?source=SGD",
                Method::Get,
                &query
            ),
            "https://api.wise.com/v1/account-requirements?source=SGD&sourceAmount=1000"
        );
    }

    #[test]
    fn test_build_url_skips_query_for_body_methods() {
        let query = vec![("a".to_string(), "1".to_string())];
        for method in [Method::Post, Method::Put, Method::Patch] {
            assert_eq!(
                build_url("https://api.wise.com", "v1/x", method, &query),
                "https://api.wise.com/v1/x"
            );
        }
        assert_eq!(
            build_url("https://api.wise.com", "v1/x", Method::Delete, &query),
            "https://api.wise.com/v1/x?a=1"
        );
    }

    #[test]
    fn test_debug_does_not_leak_api_key() {
        let dispatcher = Dispatcher::new(ClientConfig::new("very-secret-key")).unwrap();
        let debug = format!("{dispatcher:?}");
        assert!(!debug.contains("very-secret-key"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_api_version_is_not_prepended_to_endpoints() {
        let config = create_test_config("https://api.wise.com").with_api_version("v3");
        let dispatcher = Dispatcher::new(config).unwrap();
        assert_eq!(dispatcher.config().api_version, "v3");

        let url = build_url(
            &dispatcher.config().base_url,
            "v1/transfers",
            Method::Get,
            &[],
        );
        assert_eq!(url, "https://api.wise.com/v1/transfers");
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = Dispatcher::new(ClientConfig::new("key").with_base_url("nope"));
        assert!(matches!(result, Err(ClientError::Configuration(_))));

        let result = Dispatcher::new(ClientConfig::new("bad\nkey"));
        let error = result.unwrap_err();
        assert!(matches!(error, ClientError::Configuration(_)));
        assert!(!error.to_string().contains("bad\nkey"));
    }

    #[tokio::test]
    async fn test_get_sends_default_headers_and_query() {
        init_logging();
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v4/profiles/42/balances"))
            .and(query_param("types", "STANDARD"))
            .and(header("authorization", "Bearer test-key"))
            .and(header("content-type", "application/json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{"id": 1, "currency": "EUR"}])),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let dispatcher = Dispatcher::new(create_test_config(&mock_server.uri())).unwrap();
        let balances = dispatcher
            .get("v4/profiles/42/balances", &[("types", "STANDARD")])
            .await
            .unwrap();

        assert_eq!(balances, json!([{"id": 1, "currency": "EUR"}]));
    }

    #[tokio::test]
    async fn test_not_found_is_classified() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v4/profiles/42/balances"))
            .and(query_param("types", "STANDARD"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "not found"})))
            .mount(&mock_server)
            .await;

        let dispatcher = Dispatcher::new(create_test_config(&mock_server.uri())).unwrap();
        let error = dispatcher
            .get("v4/profiles/42/balances", &[("types", "STANDARD")])
            .await
            .unwrap_err();

        let api_error = error.api_error().expect("classified error");
        assert_eq!(api_error.kind, ApiErrorKind::NotFound);
        assert_eq!(api_error.message, "not found");
        assert_eq!(api_error.status, 404);
        assert_eq!(api_error.raw_payload, Some(json!({"message": "not found"})));
    }

    #[tokio::test]
    async fn test_validation_error_on_post() {
        let mock_server = MockServer::start().await;
        let quote = json!({
            "sourceCurrency": "GBP",
            "targetCurrency": "EUR",
            "sourceAmount": 100
        });

        Mock::given(method("POST"))
            .and(path("/v3/quotes"))
            .and(body_json(&quote))
            .respond_with(
                ResponseTemplate::new(422).set_body_json(json!({"error": "targetAmount required"})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let dispatcher = Dispatcher::new(create_test_config(&mock_server.uri())).unwrap();
        let error = dispatcher.post("v3/quotes", Some(quote)).await.unwrap_err();

        assert!(error.is_validation_error());
        assert_eq!(error.api_error().unwrap().message, "targetAmount required");
    }

    #[tokio::test]
    async fn test_authentication_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2/profiles"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": "invalid_token",
                "error_description": "Invalid token"
            })))
            .mount(&mock_server)
            .await;

        let dispatcher = Dispatcher::new(create_test_config(&mock_server.uri())).unwrap();
        let error = dispatcher.get("v2/profiles", &[]).await.unwrap_err();

        assert!(error.is_authentication_error());
        assert_eq!(error.status(), Some(401));
        assert!(!error.to_string().contains("test-key"));
    }

    #[tokio::test]
    async fn test_server_error_with_non_json_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/v2/accounts/9"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let dispatcher = Dispatcher::new(create_test_config(&mock_server.uri())).unwrap();
        let error = dispatcher.delete("v2/accounts/9").await.unwrap_err();

        let api_error = error.api_error().unwrap();
        assert_eq!(api_error.kind, ApiErrorKind::Generic);
        assert_eq!(api_error.status, 502);
        assert_eq!(api_error.message, "Unknown error");
        assert!(api_error.raw_payload.is_none());
    }

    #[tokio::test]
    async fn test_failure_status_is_not_retried() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/rates"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({"message": "busy"})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let dispatcher = Dispatcher::new(create_test_config(&mock_server.uri())).unwrap();
        let error = dispatcher.get("v1/rates", &[]).await.unwrap_err();
        assert_eq!(error.kind(), Some(ApiErrorKind::Generic));
    }

    #[tokio::test]
    async fn test_accept_header_returns_raw_bytes() {
        let mock_server = MockServer::start().await;
        let pdf = b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n1 0 obj\n".to_vec();

        Mock::given(method("GET"))
            .and(path("/v1/transfers/7/receipt.pdf"))
            .and(header("accept", "application/pdf"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(pdf.clone(), "application/pdf"),
            )
            .mount(&mock_server)
            .await;

        let dispatcher = Dispatcher::new(create_test_config(&mock_server.uri())).unwrap();
        let response = dispatcher
            .execute(
                RequestSpec::get("v1/transfers/7/receipt.pdf")
                    .with_header("Accept", "application/pdf"),
            )
            .await
            .unwrap();

        assert_eq!(response, ApiResponse::Raw(Bytes::from(pdf)));
    }

    #[tokio::test]
    async fn test_accept_header_skips_json_decoding_of_json_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/profiles/1/balance-statements/2/statement.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"a":1}"#))
            .mount(&mock_server)
            .await;

        let dispatcher = Dispatcher::new(create_test_config(&mock_server.uri())).unwrap();
        let bytes = dispatcher
            .execute_raw(
                RequestSpec::get("v1/profiles/1/balance-statements/2/statement.json")
                    .with_header("Accept", "application/json"),
            )
            .await
            .unwrap();

        assert_eq!(bytes.as_ref(), br#"{"a":1}"#);
    }

    #[tokio::test]
    async fn test_extra_headers_override_defaults() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v2/profiles/personal-profile"))
            .and(header("content-type", "application/vnd.custom+json"))
            .and(header("x-idempotence-uuid", "3f1c"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 5})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let dispatcher = Dispatcher::new(create_test_config(&mock_server.uri())).unwrap();
        let profile = dispatcher
            .execute_json(
                RequestSpec::post("v2/profiles/personal-profile")
                    .with_body(json!({"firstName": "Ada"}))
                    .with_header("Content-Type", "application/vnd.custom+json")
                    .with_header("X-idempotence-uuid", "3f1c"),
            )
            .await
            .unwrap();

        assert_eq!(profile, json!({"id": 5}));
    }

    #[tokio::test]
    async fn test_invalid_extra_header_is_rejected() {
        let dispatcher = Dispatcher::new(ClientConfig::new("k")).unwrap();
        let error = dispatcher
            .execute(RequestSpec::get("v2/profiles").with_header("bad header", "x"))
            .await
            .unwrap_err();
        assert!(matches!(error, ClientError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_empty_success_body_is_null() {
        let mock_server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/v4/profiles/1/balances/2"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&mock_server)
            .await;

        let dispatcher = Dispatcher::new(create_test_config(&mock_server.uri())).unwrap();
        let value = dispatcher.delete("v4/profiles/1/balances/2").await.unwrap();
        assert_eq!(value, Value::Null);
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_serialization_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2/profiles"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let dispatcher = Dispatcher::new(create_test_config(&mock_server.uri())).unwrap();
        let error = dispatcher.get("v2/profiles", &[]).await.unwrap_err();
        assert!(matches!(error, ClientError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_body_is_not_sent_for_get() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2/profiles"))
            .respond_with(|request: &wiremock::Request| {
                assert!(request.body.is_empty());
                ResponseTemplate::new(200).set_body_json(json!([]))
            })
            .mount(&mock_server)
            .await;

        let dispatcher = Dispatcher::new(create_test_config(&mock_server.uri())).unwrap();
        dispatcher
            .execute(RequestSpec::get("v2/profiles").with_body(json!({"ignored": true})))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_transport_fault_recovers_on_second_attempt() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2/profiles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let (flaky, attempts) = FlakyTransport::new(1);
        let dispatcher = Dispatcher::builder(create_test_config(&mock_server.uri()))
            .middleware(flaky)
            .build()
            .unwrap();

        let profiles = dispatcher.get("v2/profiles", &[]).await.unwrap();
        assert_eq!(profiles, json!([{"id": 1}]));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_transport_fault_exhausts_three_attempts() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2/profiles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&mock_server)
            .await;

        let (flaky, attempts) = FlakyTransport::new(usize::MAX);
        let dispatcher = Dispatcher::builder(create_test_config(&mock_server.uri()))
            .middleware(flaky)
            .build()
            .unwrap();

        let started = Instant::now();
        let error = dispatcher.get("v2/profiles", &[]).await.unwrap_err();
        let elapsed = started.elapsed();

        assert!(error.is_retryable());
        assert!(error.api_error().is_none());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert!(elapsed >= Duration::from_millis(200), "elapsed {elapsed:?}");
    }

    /// Serves `200` headers announcing more body than is written, then
    /// closes the connection. Returns the base URL and the accept counter.
    async fn spawn_truncating_server() -> (String, Arc<AtomicUsize>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&connections);

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(
                        b"HTTP/1.1 200 OK\r\n\
                          Content-Type: application/json\r\n\
                          Content-Length: 100\r\n\r\n\
                          {\"id\":1",
                    )
                    .await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{addr}"), connections)
    }

    #[tokio::test]
    async fn test_truncated_body_is_retried() {
        init_logging();
        let (base_url, connections) = spawn_truncating_server().await;
        let dispatcher = Dispatcher::new(create_test_config(&base_url)).unwrap();

        let started = Instant::now();
        let error = dispatcher.get("v2/profiles", &[]).await.unwrap_err();
        let elapsed = started.elapsed();

        assert!(error.is_retryable());
        assert!(error.api_error().is_none());
        assert_eq!(connections.load(Ordering::SeqCst), 3);
        assert!(elapsed >= Duration::from_millis(200), "elapsed {elapsed:?}");
    }

    #[tokio::test]
    async fn test_truncated_body_is_not_retried_for_post_when_idempotent_only() {
        let (base_url, connections) = spawn_truncating_server().await;
        let config = create_test_config(&base_url).with_retry(RetryConfig {
            scope: RetryScope::IdempotentOnly,
            ..RetryConfig::default()
        });
        let dispatcher = Dispatcher::new(config).unwrap();

        let error = dispatcher.post("v1/transfers", None).await.unwrap_err();
        assert!(error.is_retryable());
        assert_eq!(connections.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_idempotent_only_scope_does_not_retry_post() {
        let mock_server = MockServer::start().await;

        let (flaky, attempts) = FlakyTransport::new(usize::MAX);
        let config = create_test_config(&mock_server.uri()).with_retry(RetryConfig {
            scope: RetryScope::IdempotentOnly,
            ..RetryConfig::default()
        });
        let dispatcher = Dispatcher::builder(config).middleware(flaky).build().unwrap();

        let error = dispatcher
            .post("v1/transfers", Some(json!({"targetAccount": 1})))
            .await
            .unwrap_err();
        assert!(error.is_retryable());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);

        let error = dispatcher.get("v1/transfers/1", &[]).await.unwrap_err();
        assert!(error.is_retryable());
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_cached_get_hits_upstream_once() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2/profiles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let dispatcher = Dispatcher::new(create_test_config(&mock_server.uri())).unwrap();
        let ttl = Duration::from_secs(60);
        let first = dispatcher.get_cached("v2/profiles", &[], ttl).await.unwrap();
        let second = dispatcher.get_cached("v2/profiles", &[], ttl).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_cached_get_refetches_after_ttl() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/rates"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"rate": 1.1}])))
            .expect(2)
            .mount(&mock_server)
            .await;

        let dispatcher = Dispatcher::new(create_test_config(&mock_server.uri())).unwrap();
        let ttl = Duration::from_millis(50);
        dispatcher.get_cached("v1/rates", &[], ttl).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        dispatcher.get_cached("v1/rates", &[], ttl).await.unwrap();
    }

    #[tokio::test]
    async fn test_cache_key_includes_query() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/rates"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(2)
            .mount(&mock_server)
            .await;

        let dispatcher = Dispatcher::new(create_test_config(&mock_server.uri())).unwrap();
        let ttl = Duration::from_secs(60);
        dispatcher
            .get_cached("v1/rates", &[("source", "EUR")], ttl)
            .await
            .unwrap();
        dispatcher
            .get_cached("v1/rates", &[("source", "GBP")], ttl)
            .await
            .unwrap();
        dispatcher
            .get_cached("v1/rates", &[("source", "EUR")], ttl)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_uncached_get_always_hits_upstream() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2/profiles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(2)
            .mount(&mock_server)
            .await;

        let dispatcher = Dispatcher::new(create_test_config(&mock_server.uri())).unwrap();
        dispatcher.get("v2/profiles", &[]).await.unwrap();
        dispatcher.get("v2/profiles", &[]).await.unwrap();
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2/profiles"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/profiles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 2}])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let dispatcher = Dispatcher::new(create_test_config(&mock_server.uri())).unwrap();
        let ttl = Duration::from_secs(60);
        assert!(dispatcher.get_cached("v2/profiles", &[], ttl).await.is_err());
        let value = dispatcher.get_cached("v2/profiles", &[], ttl).await.unwrap();
        assert_eq!(value, json!([{"id": 2}]));
    }

    #[tokio::test]
    async fn test_noop_cache_store_disables_caching() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2/profiles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(2)
            .mount(&mock_server)
            .await;

        let dispatcher = Dispatcher::builder(create_test_config(&mock_server.uri()))
            .cache_store(Arc::new(NoopCacheStore))
            .build()
            .unwrap();
        let ttl = Duration::from_secs(60);
        dispatcher.get_cached("v2/profiles", &[], ttl).await.unwrap();
        dispatcher.get_cached("v2/profiles", &[], ttl).await.unwrap();
    }

    #[tokio::test]
    async fn test_requests_route_through_proxy() {
        let proxy_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2/profiles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"via": "proxy"}])))
            .expect(1)
            .mount(&proxy_server)
            .await;

        let config = ClientConfig::new("test-key")
            .with_base_url("http://api.wise.invalid")
            .with_proxy(proxy_server.uri());
        let dispatcher = Dispatcher::new(config).unwrap();

        let value = dispatcher.get("v2/profiles", &[]).await.unwrap();
        assert_eq!(value, json!([{"via": "proxy"}]));
    }
}

#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn query_pairs_keep_insertion_order(
            pairs in prop::collection::vec(("[a-z]{1,6}", "[a-zA-Z0-9]{0,6}"), 1..6)
        ) {
            let url = build_url("https://api.wise.com", "v1/x", Method::Get, &pairs);
            let (_, query) = url.split_once('?').unwrap_or_default();
            let decoded: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect();
            prop_assert_eq!(decoded, pairs);
        }

        #[test]
        fn body_methods_never_get_a_query(
            pairs in prop::collection::vec(("[a-z]{1,6}", "[a-z]{1,6}"), 0..4)
        ) {
            for method in [Method::Post, Method::Put, Method::Patch] {
                let url = build_url("https://api.wise.com", "v1/x", method, &pairs);
                prop_assert!(!url.contains('?'));
            }
        }
    }
}
