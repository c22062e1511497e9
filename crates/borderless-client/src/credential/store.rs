use async_trait::async_trait;
use dashmap::DashMap;

/// Lookup table from proxy token to encrypted API secret.
///
/// Implementations only need point lookups; the verifier never writes.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Returns the encrypted secret stored for `proxy_token`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be queried.
    async fn encrypted_secret(&self, proxy_token: &str) -> anyhow::Result<Option<String>>;
}

/// Credential rows kept in memory.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    rows: DashMap<String, String>,
}

impl InMemoryCredentialStore {
    /// Stores `encrypted_secret` under `proxy_token`, replacing any earlier row.
    pub fn insert(&self, proxy_token: impl Into<String>, encrypted_secret: impl Into<String>) {
        self.rows.insert(proxy_token.into(), encrypted_secret.into());
    }

    /// Removes the row for `proxy_token`.
    pub fn remove(&self, proxy_token: &str) -> Option<String> {
        self.rows.remove(proxy_token).map(|(_, secret)| secret)
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn encrypted_secret(&self, proxy_token: &str) -> anyhow::Result<Option<String>> {
        Ok(self.rows.get(proxy_token).map(|row| row.value().clone()))
    }
}
