use std::fmt;
use std::time::Duration;

use serde_json::Value;

/// Ordered query parameters; insertion order is preserved on the wire.
pub type QueryParams = Vec<(String, String)>;

/// HTTP methods the dispatcher issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `PATCH`
    Patch,
    /// `DELETE`
    Delete,
}

impl Method {
    /// Upper-case method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Whether the method sends a JSON body.
    ///
    /// Non-body methods carry their parameters in the query string instead.
    #[must_use]
    pub const fn allows_body(self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }

    /// Whether repeating the request has no additional effect.
    #[must_use]
    pub const fn is_idempotent(self) -> bool {
        matches!(self, Self::Get | Self::Put | Self::Delete)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Description of one outbound call.
///
/// Built per call and consumed by the dispatcher; nothing here is retained
/// once the call completes.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use borderless_common::{Method, RequestSpec};
///
/// let spec = RequestSpec::get("v1/transfers/7/receipt.pdf")
///     .with_header("Accept", "application/pdf");
/// assert!(spec.expects_raw_body());
///
/// let spec = RequestSpec::get("v2/profiles").cached(Duration::from_secs(60));
/// assert!(spec.is_cacheable());
///
/// let spec = RequestSpec::new(Method::Post, "v3/quotes").cached(Duration::from_secs(60));
/// assert!(!spec.is_cacheable());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    /// HTTP method.
    pub method: Method,
    /// Endpoint path relative to the base URL.
    pub endpoint: String,
    /// Query parameters, sent only for non-body methods.
    pub query: QueryParams,
    /// JSON body, sent only for body methods.
    pub body: Option<Value>,
    /// Extra headers; these override the defaults on name collision.
    pub headers: Vec<(String, String)>,
    /// Time-to-live when the caller opts into response caching.
    pub cache_ttl: Option<Duration>,
}

impl RequestSpec {
    /// Creates a request with no parameters, body or headers.
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            query: Vec::new(),
            body: None,
            headers: Vec::new(),
            cache_ttl: None,
        }
    }

    /// Creates a `GET` request.
    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Get, endpoint)
    }

    /// Creates a `POST` request.
    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Post, endpoint)
    }

    /// Creates a `PUT` request.
    pub fn put(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Put, endpoint)
    }

    /// Creates a `PATCH` request.
    pub fn patch(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Patch, endpoint)
    }

    /// Creates a `DELETE` request.
    pub fn delete(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Delete, endpoint)
    }

    /// Appends one query parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Appends query parameters in iteration order.
    #[must_use]
    pub fn with_query_pairs<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Sets the JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets an extra header, replacing an earlier one with the same name.
    ///
    /// Header names compare case-insensitively.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers
            .retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    /// Opts this call into response caching for `ttl`.
    ///
    /// Only honoured for `GET` requests that decode JSON.
    #[must_use]
    pub const fn cached(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Looks up an extra header by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Whether the caller asked for the raw response body.
    ///
    /// An `Accept` header anywhere in the merged header set is the signal;
    /// the defaults never carry one, so only the extra headers matter.
    #[must_use]
    pub fn expects_raw_body(&self) -> bool {
        self.header("accept").is_some()
    }

    /// Whether this call may be answered from the response cache.
    #[must_use]
    pub fn is_cacheable(&self) -> bool {
        self.method == Method::Get && self.cache_ttl.is_some() && !self.expects_raw_body()
    }
}
