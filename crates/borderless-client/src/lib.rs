//! # borderless-client
//!
//! Transport core for the Wise REST API.
//!
//! This crate owns the parts of the client that make decisions:
//! - **Dispatch**: URL construction, header merging, fixed-delay transport
//!   retries, JSON or raw-byte decoding ([`Dispatcher`])
//! - **Error classification**: every non-2xx response becomes exactly one
//!   [`ApiError`] ([`error::classify`])
//! - **Response caching**: opt-in memoization of GETs over a pluggable
//!   [`CacheStore`]
//! - **Credential verification**: binding proxy tokens to encrypted stored
//!   API keys ([`CredentialVerifier`])
//!
//! Resource-specific wrappers live in the `borderless` crate and only call
//! the dispatcher's verbs.
//!
//! ## Example
//!
//! ```no_run
//! use std::time::Duration;
//! use borderless_client::Dispatcher;
//! use borderless_common::ClientConfig;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ClientConfig::from_env()?;
//! let dispatcher = Dispatcher::new(config)?;
//!
//! let profiles = dispatcher
//!     .get_cached("v2/profiles", &[], Duration::from_secs(60))
//!     .await?;
//! println!("{profiles}");
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod credential;
pub mod dispatcher;
pub mod error;
pub mod retry;

pub use cache::{CacheStore, DEFAULT_CACHE_TTL, InMemoryCacheStore, NoopCacheStore, ResponseCache};
pub use credential::{
    CredentialCipher, CredentialStore, CredentialVerifier, InMemoryCredentialStore, VerifierConfig,
};
pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use error::{ApiError, ApiErrorKind, ClientError, Result};
