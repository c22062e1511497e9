//! Client configuration.
//!
//! Configuration is resolved once, before the dispatcher is built, and is
//! immutable afterwards. Three sources are supported:
//!
//! - builder methods on [`ClientConfig`]
//! - the process environment via [`ClientConfig::from_env`]
//! - a TOML file via [`ClientConfig::load`]
//!
//! ## Environment Variables
//!
//! | variable            | meaning                                   | default   |
//! |---------------------|-------------------------------------------|-----------|
//! | `WISE_API_KEY`      | bearer token (required)                   |           |
//! | `WISE_ENVIRONMENT`  | `sandbox` or `live`                       | `sandbox` |
//! | `WISE_BASE_URL`     | explicit host override                    |           |
//! | `WISE_API_VERSION`  | default API version label                 | `v1`      |
//! | `WISE_TIMEOUT`      | per-attempt timeout in seconds            | `30`      |
//! | `WISE_PROXY`        | outbound proxy URL, empty for none        |           |
//!
//! ## Example Configuration File
//!
//! ```toml
//! environment = "live"
//! api_key_env = "WISE_API_KEY"
//! timeout_seconds = 20
//! proxy = "http://egress.internal:3128"
//!
//! [retry]
//! max_attempts = 3
//! delay_ms = 100
//! scope = "idempotent_only"
//! ```

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::request::Method;

/// Environment variable holding the API key.
pub const ENV_API_KEY: &str = "WISE_API_KEY";
/// Environment variable selecting sandbox or live.
pub const ENV_ENVIRONMENT: &str = "WISE_ENVIRONMENT";
/// Environment variable overriding the base URL.
pub const ENV_BASE_URL: &str = "WISE_BASE_URL";
/// Environment variable overriding the API version label.
pub const ENV_API_VERSION: &str = "WISE_API_VERSION";
/// Environment variable holding the timeout in seconds.
pub const ENV_TIMEOUT: &str = "WISE_TIMEOUT";
/// Environment variable holding the outbound proxy URL.
pub const ENV_PROXY: &str = "WISE_PROXY";

/// Default per-attempt timeout in seconds.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
/// Default API version label.
pub const DEFAULT_API_VERSION: &str = "v1";

const SANDBOX_BASE_URL: &str = "https://api.sandbox.transferwise.tech";
const LIVE_BASE_URL: &str = "https://api.wise.com";

/// Errors raised while resolving or validating a [`ClientConfig`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A required variable was not set.
    #[error("Missing required setting: {0}")]
    Missing(String),

    /// The API key is empty or whitespace.
    #[error("API key must not be empty")]
    EmptyApiKey,

    /// The environment name is neither sandbox nor live.
    #[error("Unknown environment '{0}', expected 'sandbox' or 'live'")]
    UnknownEnvironment(String),

    /// The base URL is not an absolute http(s) URL.
    #[error("Invalid base URL '{url}': {reason}")]
    InvalidBaseUrl {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The proxy URL does not parse.
    #[error("Invalid proxy URL '{url}': {reason}")]
    InvalidProxy {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The timeout is zero or not a number.
    #[error("Invalid timeout: {0}")]
    InvalidTimeout(String),

    /// The retry configuration allows no attempt at all.
    #[error("Retry configuration must allow at least one attempt")]
    InvalidRetry,

    /// I/O error while reading a configuration file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML deserialization error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Deployment environment of the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// The sandbox host, for integration testing.
    #[default]
    Sandbox,
    /// The production host.
    #[serde(alias = "production")]
    Live,
}

impl Environment {
    /// Returns the base URL of this environment.
    #[must_use]
    pub const fn base_url(self) -> &'static str {
        match self {
            Self::Sandbox => SANDBOX_BASE_URL,
            Self::Live => LIVE_BASE_URL,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sandbox => write!(f, "sandbox"),
            Self::Live => write!(f, "live"),
        }
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" => Ok(Self::Sandbox),
            "live" | "production" => Ok(Self::Live),
            _ => Err(ConfigError::UnknownEnvironment(s.to_string())),
        }
    }
}

/// Which HTTP methods get the transport retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryScope {
    /// Every method is retried on transport faults.
    #[default]
    AllMethods,
    /// Only GET, PUT and DELETE are retried; POST and PATCH get one attempt.
    IdempotentOnly,
}

impl RetryScope {
    /// Whether a request with `method` may be attempted more than once.
    #[must_use]
    pub const fn covers(self, method: Method) -> bool {
        match self {
            Self::AllMethods => true,
            Self::IdempotentOnly => method.is_idempotent(),
        }
    }
}

/// Transport retry policy.
///
/// Retries apply to transport faults only (connection errors, timeouts,
/// interrupted bodies). A response that arrived is never retried, whatever
/// its status code.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use borderless_common::{RetryConfig, RetryScope};
///
/// let retry = RetryConfig {
///     max_attempts: 3,
///     delay: Duration::from_millis(100),
///     scope: RetryScope::IdempotentOnly,
/// };
/// assert_eq!(retry.max_retries(), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    pub delay: Duration,
    /// Methods covered by the retry budget.
    pub scope: RetryScope,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(100),
            scope: RetryScope::AllMethods,
        }
    }
}

impl RetryConfig {
    /// Number of retries after the first attempt.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_attempts.saturating_sub(1)
    }
}

/// Configuration for one dispatcher.
///
/// The API key is held in a [`SecretString`]; it is never serialized and
/// prints as `[REDACTED]` in debug output.
///
/// # Examples
///
/// ```
/// use borderless_common::{ClientConfig, Environment};
///
/// let config = ClientConfig::new("api-token")
///     .with_environment(Environment::Live)
///     .with_proxy("http://egress.internal:3128");
///
/// assert_eq!(config.base_url, "https://api.wise.com");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL every endpoint is appended to.
    pub base_url: String,
    /// Bearer token for the `Authorization` header.
    pub api_key: SecretString,
    /// API version label, informational only.
    ///
    /// Wise endpoints carry their own version segment (`v1/transfers`,
    /// `v4/profiles/..`), so this value is never prepended to a path. It is
    /// reported when a dispatcher is built.
    pub api_version: String,
    /// Per-attempt timeout in seconds.
    pub timeout_seconds: u64,
    /// Optional outbound proxy URL.
    pub proxy: Option<String>,
    /// Transport retry policy.
    pub retry: RetryConfig,
}

impl ClientConfig {
    /// Creates a sandbox configuration with default settings.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: Environment::Sandbox.base_url().to_string(),
            api_key: SecretString::new(api_key.into().into()),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            proxy: None,
            retry: RetryConfig::default(),
        }
    }

    /// Points the configuration at the host of `environment`.
    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.base_url = environment.base_url().to_string();
        self
    }

    /// Sets an explicit base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the API version label.
    #[must_use]
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    /// Sets the per-attempt timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    /// Routes outbound calls through `proxy`.
    #[must_use]
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Per-attempt timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Resolves a configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if `WISE_API_KEY` is missing or any value is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves a configuration through an arbitrary key lookup.
    ///
    /// `lookup` receives the variable names listed in the module docs.
    /// Empty values are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or any value is invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let api_key = get(ENV_API_KEY).ok_or_else(|| ConfigError::Missing(ENV_API_KEY.into()))?;

        let environment = get(ENV_ENVIRONMENT)
            .map(|value| value.parse::<Environment>())
            .transpose()?
            .unwrap_or_default();

        let mut config = Self::new(api_key).with_environment(environment);

        if let Some(base_url) = get(ENV_BASE_URL) {
            config.base_url = base_url;
        }
        if let Some(api_version) = get(ENV_API_VERSION) {
            config.api_version = api_version;
        }
        if let Some(timeout) = get(ENV_TIMEOUT) {
            config.timeout_seconds = parse_timeout(&timeout)?;
        }
        config.proxy = get(ENV_PROXY);

        config.validate()?;
        log::debug!(
            "Resolved client configuration for {} (timeout {}s, proxy: {})",
            config.base_url,
            config.timeout_seconds,
            config.proxy.is_some()
        );

        Ok(config)
    }

    /// Loads a configuration from a TOML file.
    ///
    /// The file names the environment variable that holds the API key; the
    /// key itself is read from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or the
    /// resolved configuration is invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Parses a TOML document and resolves it against the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed or the resolved
    /// configuration is invalid.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(contents)?;
        file.resolve(|key| std::env::var(key).ok())
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the API key is empty
    /// - the base URL is not an absolute http(s) URL
    /// - the timeout is zero
    /// - the proxy URL does not parse
    /// - the retry policy allows no attempt
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.expose_secret().trim().is_empty() {
            return Err(ConfigError::EmptyApiKey);
        }

        match url::Url::parse(&self.base_url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            Ok(parsed) => {
                return Err(ConfigError::InvalidBaseUrl {
                    url: self.base_url.clone(),
                    reason: format!("unsupported scheme '{}'", parsed.scheme()),
                });
            }
            Err(e) => {
                return Err(ConfigError::InvalidBaseUrl {
                    url: self.base_url.clone(),
                    reason: e.to_string(),
                });
            }
        }

        if self.timeout_seconds == 0 {
            return Err(ConfigError::InvalidTimeout(
                "timeout must be at least one second".to_string(),
            ));
        }

        if let Some(proxy) = &self.proxy
            && let Err(e) = url::Url::parse(proxy)
        {
            return Err(ConfigError::InvalidProxy {
                url: proxy.clone(),
                reason: e.to_string(),
            });
        }

        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidRetry);
        }

        Ok(())
    }
}

fn parse_timeout(value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidTimeout(format!("'{value}': {e}")))
}

/// On-disk configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    /// Target environment (default: sandbox).
    #[serde(default)]
    pub environment: Environment,

    /// Explicit base URL, overriding the environment's host.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// API version label (default: v1).
    #[serde(default)]
    pub api_version: Option<String>,

    /// Per-attempt timeout in seconds (default: 30).
    #[serde(default)]
    pub timeout_seconds: Option<u64>,

    /// Outbound proxy URL.
    #[serde(default)]
    pub proxy: Option<String>,

    /// Retry settings.
    #[serde(default)]
    pub retry: RetrySection,
}

/// `[retry]` table of the configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrySection {
    /// Total attempts including the first.
    #[serde(default)]
    pub max_attempts: Option<u32>,
    /// Delay between attempts in milliseconds.
    #[serde(default)]
    pub delay_ms: Option<u64>,
    /// Methods covered by the retry budget.
    #[serde(default)]
    pub scope: Option<RetryScope>,
}

fn default_api_key_env() -> String {
    ENV_API_KEY.to_string()
}

impl FileConfig {
    /// Resolves the document into a [`ClientConfig`], reading the API key
    /// through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key variable is unset or the resulting
    /// configuration is invalid.
    pub fn resolve<F>(self, lookup: F) -> Result<ClientConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(&self.api_key_env)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| ConfigError::Missing(self.api_key_env.clone()))?;

        let defaults = RetryConfig::default();
        let retry = RetryConfig {
            max_attempts: self.retry.max_attempts.unwrap_or(defaults.max_attempts),
            delay: self
                .retry
                .delay_ms
                .map_or(defaults.delay, Duration::from_millis),
            scope: self.retry.scope.unwrap_or(defaults.scope),
        };

        let mut config = ClientConfig::new(api_key)
            .with_environment(self.environment)
            .with_retry(retry);

        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }
        if let Some(api_version) = self.api_version {
            config.api_version = api_version;
        }
        if let Some(timeout) = self.timeout_seconds {
            config.timeout_seconds = timeout;
        }
        config.proxy = self.proxy.filter(|proxy| !proxy.trim().is_empty());

        config.validate()?;
        Ok(config)
    }
}
