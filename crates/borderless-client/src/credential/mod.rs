//! Proxy credential verification.
//!
//! Integrators receiving inbound requests that claim to act for an account
//! use [`CredentialVerifier::verify`] to check that the caller's proxy token
//! maps to the expected API key. The stored key is encrypted at rest with
//! a process-wide [`CredentialCipher`].
//!
//! Verification can be switched off per deployment (`VERIFY_PROXY`), in
//! which case every token is accepted. That is an escape hatch for
//! environments without a credential table, not a security guarantee.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use borderless_client::credential::{
//!     CredentialCipher, CredentialVerifier, InMemoryCredentialStore, VerifierConfig,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cipher = CredentialCipher::from_base64_key(&CredentialCipher::generate_key())?;
//! let store = InMemoryCredentialStore::default();
//! store.insert("proxy-7", cipher.encrypt("sk_live_123")?);
//!
//! let verifier = CredentialVerifier::new(VerifierConfig::enabled(), Arc::new(store), cipher);
//! assert!(verifier.verify("proxy-7", "sk_live_123").await);
//! assert!(!verifier.verify("proxy-7", "sk_live_124").await);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use hmac::{Hmac, Mac};
use log::{debug, warn};
use secrecy::ExposeSecret;
use sha2::Sha256;

mod cipher;
mod store;

pub use self::cipher::{CipherError, CredentialCipher, ENV_CREDENTIAL_KEY};
pub use self::store::{CredentialStore, InMemoryCredentialStore};

type HmacSha256 = Hmac<Sha256>;

/// Environment variable toggling verification.
pub const ENV_VERIFY_PROXY: &str = "VERIFY_PROXY";

/// Deployment-time verifier settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerifierConfig {
    /// When false, every token is accepted without a lookup.
    pub enabled: bool,
}

impl VerifierConfig {
    /// Verification switched on.
    #[must_use]
    pub const fn enabled() -> Self {
        Self { enabled: true }
    }

    /// Verification switched off.
    #[must_use]
    pub const fn disabled() -> Self {
        Self { enabled: false }
    }

    /// Reads `VERIFY_PROXY` from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads `VERIFY_PROXY` through `lookup`.
    ///
    /// `1`, `true`, `yes` and `on` (any case) enable verification; anything
    /// else, including an unset variable, disables it.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let enabled = lookup(ENV_VERIFY_PROXY).is_some_and(|value| is_truthy(&value));
        Self { enabled }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Binds proxy tokens to stored, encrypted API keys.
pub struct CredentialVerifier {
    config: VerifierConfig,
    store: Arc<dyn CredentialStore>,
    cipher: CredentialCipher,
    mac_key: [u8; 32],
}

impl std::fmt::Debug for CredentialVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialVerifier")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CredentialVerifier {
    /// Creates a verifier over `store`, decrypting with `cipher`.
    pub fn new(
        config: VerifierConfig,
        store: Arc<dyn CredentialStore>,
        cipher: CredentialCipher,
    ) -> Self {
        Self {
            config,
            store,
            cipher,
            mac_key: cipher::random_key(),
        }
    }

    /// Whether lookups are performed at all.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Checks that `proxy_token` maps to `expected_api_key`.
    ///
    /// Returns `true` unconditionally while verification is disabled.
    /// Otherwise returns `false` when no row matches, when the lookup or
    /// decryption fails, or when the decrypted key differs from
    /// `expected_api_key`. Never errors.
    pub async fn verify(&self, proxy_token: &str, expected_api_key: &str) -> bool {
        if !self.config.enabled {
            debug!("Proxy verification disabled, accepting token");
            return true;
        }

        let stored = match self.store.encrypted_secret(proxy_token).await {
            Ok(Some(stored)) => stored,
            Ok(None) => {
                debug!("No stored credential for proxy token");
                return false;
            }
            Err(e) => {
                warn!("Credential lookup failed: {e:#}");
                return false;
            }
        };

        let decrypted = match self.cipher.decrypt(&stored) {
            Ok(decrypted) => decrypted,
            Err(e) => {
                warn!("Stored credential rejected: {e}");
                return false;
            }
        };

        let matches = self.constant_time_eq(
            decrypted.expose_secret().as_bytes(),
            expected_api_key.as_bytes(),
        );
        if !matches {
            debug!("Stored credential does not match the expected API key");
        }
        matches
    }

    // Compares MACs of both sides under a per-verifier key; `verify_slice`
    // runs in constant time and the MAC hides length differences.
    fn constant_time_eq(&self, actual: &[u8], expected: &[u8]) -> bool {
        let (Ok(mut actual_mac), Ok(mut expected_mac)) = (
            HmacSha256::new_from_slice(&self.mac_key),
            HmacSha256::new_from_slice(&self.mac_key),
        ) else {
            return false;
        };
        actual_mac.update(actual);
        expected_mac.update(expected);
        let expected_tag = expected_mac.finalize().into_bytes();
        actual_mac.verify_slice(&expected_tag).is_ok()
    }
}
