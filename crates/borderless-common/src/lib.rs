//! # borderless-common
//!
//! Leaf types shared by the borderless crates.
//!
//! This crate holds everything the request dispatcher needs before it can talk
//! to the network:
//! - [`ClientConfig`] and the resolver that builds it from the environment or a TOML file
//! - [`RequestSpec`], the per-call description of one outbound request
//! - [`ApiResponse`], the decoded body of a successful call
//!
//! ## Example
//!
//! ```
//! use borderless_common::{ClientConfig, Environment, RequestSpec};
//!
//! let config = ClientConfig::new("api-token")
//!     .with_environment(Environment::Sandbox)
//!     .with_timeout(10);
//! assert_eq!(config.base_url, "https://api.sandbox.transferwise.tech");
//!
//! let request = RequestSpec::get("v4/profiles/42/balances").with_query("types", "STANDARD");
//! assert_eq!(request.query.len(), 1);
//! ```

/// Client configuration and its resolution from environment or file sources.
pub mod config;
/// Per-call request description.
pub mod request;
/// Decoded response bodies.
pub mod response;

pub use config::{ClientConfig, ConfigError, Environment, FileConfig, RetryConfig, RetryScope};
pub use request::{Method, QueryParams, RequestSpec};
pub use response::ApiResponse;
