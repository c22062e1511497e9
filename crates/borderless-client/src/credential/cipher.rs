use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use secrecy::SecretString;
use thiserror::Error;

/// Environment variable holding the base64-encoded 32-byte credential key.
pub const ENV_CREDENTIAL_KEY: &str = "WISE_CREDENTIAL_KEY";

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Errors raised while encrypting or decrypting a stored credential.
///
/// None of the variants carry key material or plaintext.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The key is missing or not 32 bytes of base64.
    #[error("Invalid credential key: {0}")]
    InvalidKey(String),

    /// The stored value is not valid base64.
    #[error("Stored credential is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    /// The stored value is too short to hold a nonce and a tag.
    #[error("Stored credential is truncated")]
    Truncated,

    /// Authentication failed: tampered data or the wrong key.
    #[error("Stored credential failed authentication")]
    Decryption,

    /// Encryption failed.
    #[error("Credential encryption failed")]
    Encryption,

    /// The decrypted bytes are not UTF-8.
    #[error("Decrypted credential is not valid UTF-8")]
    NotUtf8,
}

/// AES-256-GCM cipher for stored API secrets.
///
/// Stored values are standard base64 of `nonce (12 bytes) || ciphertext || tag`.
#[derive(Clone)]
pub struct CredentialCipher {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for CredentialCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCipher")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl CredentialCipher {
    /// Creates a cipher from raw key bytes.
    #[must_use]
    pub fn new(key: &[u8; 32]) -> Self {
        Self {
            cipher: Aes256Gcm::new(key.into()),
        }
    }

    /// Creates a cipher from a base64-encoded 32-byte key.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidKey`] if the key does not decode to
    /// exactly 32 bytes.
    pub fn from_base64_key(encoded: &str) -> Result<Self, CipherError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CipherError::InvalidKey(e.to_string()))?;
        let cipher = Aes256Gcm::new_from_slice(&bytes).map_err(|_| {
            CipherError::InvalidKey(format!("expected 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Self { cipher })
    }

    /// Creates a cipher from the key in `WISE_CREDENTIAL_KEY`.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidKey`] if the variable is unset or invalid.
    pub fn from_env() -> Result<Self, CipherError> {
        let encoded = std::env::var(ENV_CREDENTIAL_KEY)
            .map_err(|_| CipherError::InvalidKey(format!("{ENV_CREDENTIAL_KEY} is not set")))?;
        Self::from_base64_key(&encoded)
    }

    /// Generates a fresh random key, base64-encoded.
    #[must_use]
    pub fn generate_key() -> String {
        STANDARD.encode(random_key())
    }

    /// Encrypts `plaintext` under a fresh random nonce.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Encryption`] if the AEAD rejects the input.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let nonce = Aes256Gcm::generate_nonce(OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CipherError::Encryption)?;

        let mut payload = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        payload.extend_from_slice(&nonce);
        payload.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(payload))
    }

    /// Decrypts a stored value.
    ///
    /// # Errors
    ///
    /// Fails on malformed base64, truncated input, a tag mismatch (tampered
    /// data or wrong key) or non-UTF-8 plaintext.
    pub fn decrypt(&self, stored: &str) -> Result<SecretString, CipherError> {
        let payload = STANDARD.decode(stored.trim())?;
        if payload.len() < NONCE_LEN + TAG_LEN {
            return Err(CipherError::Truncated);
        }

        let (nonce, ciphertext) = payload.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CipherError::Decryption)?;

        String::from_utf8(plaintext)
            .map(|text| SecretString::new(text.into()))
            .map_err(|_| CipherError::NotUtf8)
    }
}

/// 32 random bytes from the OS generator.
pub(crate) fn random_key() -> [u8; 32] {
    let key = Aes256Gcm::generate_key(OsRng);
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&key);
    bytes
}
