//! AES-256-GCM credential vault with key rotation.
//!
//! Secrets are JSON documents. The stored text is
//! `base64(nonce (12 bytes) || ciphertext || tag)`, always produced with the
//! current primary key. Decryption tries the primary key first and then
//! every previous key in registration order, so keys can be rotated without
//! downtime: add the new key as primary, keep the old one as previous, and
//! re-encrypt stored credentials at leisure with [`CredentialVault::rotate`].
//!
//! SECURITY: Error types never contain plaintext or key material.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use agentry_core::repository::credential::SecretCipher;
use agentry_types::error::VaultError;

/// Nonce size for AES-256-GCM (96 bits / 12 bytes).
const NONCE_SIZE: usize = 12;

/// Environment variable holding the primary key (base64 of 32 bytes).
pub const PRIMARY_KEY_ENV: &str = "CREDENTIALS_ENCRYPTION_KEY";

/// Environment variable holding previous keys, comma-separated, oldest last.
pub const PREVIOUS_KEYS_ENV: &str = "CREDENTIALS_ENCRYPTION_KEY_OLD";

pub struct CredentialVault {
    primary: Aes256Gcm,
    previous: Vec<Aes256Gcm>,
}

impl CredentialVault {
    /// Create a vault from raw 32-byte keys.
    pub fn new(primary: &[u8; 32], previous: &[[u8; 32]]) -> Self {
        Self {
            primary: Aes256Gcm::new(primary.into()),
            previous: previous.iter().map(|k| Aes256Gcm::new(k.into())).collect(),
        }
    }

    /// Create a vault from base64 keys: the primary key and an optional
    /// comma-separated list of previous keys.
    pub fn from_base64_keys(primary: &str, previous: Option<&str>) -> Result<Self, VaultError> {
        let primary = decode_key(primary)?;
        let previous = previous
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(decode_key)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(&primary, &previous))
    }

    /// Create a vault from `CREDENTIALS_ENCRYPTION_KEY` and
    /// `CREDENTIALS_ENCRYPTION_KEY_OLD`.
    pub fn from_env() -> Result<Self, VaultError> {
        let primary = std::env::var(PRIMARY_KEY_ENV).map_err(|_| VaultError::MissingKey)?;
        let previous = std::env::var(PREVIOUS_KEYS_ENV).ok();
        let vault = Self::from_base64_keys(&primary, previous.as_deref())?;
        tracing::info!(previous_keys = vault.previous.len(), "credential vault initialized");
        Ok(vault)
    }

    /// Number of keys tried on decryption.
    pub fn key_count(&self) -> usize {
        1 + self.previous.len()
    }

    pub fn encrypt_value(&self, secret: &serde_json::Value) -> Result<String, VaultError> {
        let plaintext = serde_json::to_vec(secret).map_err(|_| VaultError::Encrypt)?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .primary
            .encrypt(&nonce, plaintext.as_slice())
            .map_err(|_| VaultError::Encrypt)?;

        let mut raw = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        raw.extend_from_slice(&nonce);
        raw.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(raw))
    }

    pub fn decrypt_value(&self, ciphertext: &str) -> Result<serde_json::Value, VaultError> {
        let raw = BASE64
            .decode(ciphertext.trim())
            .map_err(|_| VaultError::Malformed("not valid base64".to_string()))?;
        if raw.len() < NONCE_SIZE {
            return Err(VaultError::Malformed("too short".to_string()));
        }
        let (nonce_bytes, body) = raw.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = std::iter::once(&self.primary)
            .chain(self.previous.iter())
            .find_map(|cipher| cipher.decrypt(nonce, body).ok())
            .ok_or(VaultError::Decrypt)?;

        serde_json::from_slice(&plaintext)
            .map_err(|_| VaultError::Malformed("plaintext is not JSON".to_string()))
    }

    /// Re-encrypt a ciphertext under the current primary key.
    pub fn rotate(&self, ciphertext: &str) -> Result<String, VaultError> {
        let secret = self.decrypt_value(ciphertext)?;
        self.encrypt_value(&secret)
    }

    /// Generate a fresh random key, base64 encoded.
    pub fn generate_key() -> String {
        BASE64.encode(Aes256Gcm::generate_key(&mut OsRng))
    }
}

impl SecretCipher for CredentialVault {
    fn encrypt(&self, secret: &serde_json::Value) -> Result<String, VaultError> {
        self.encrypt_value(secret)
    }

    fn decrypt(&self, ciphertext: &str) -> Result<serde_json::Value, VaultError> {
        self.decrypt_value(ciphertext)
    }
}

fn decode_key(encoded: &str) -> Result<[u8; 32], VaultError> {
    let bytes = BASE64
        .decode(encoded.trim())
        .map_err(|_| VaultError::InvalidKey("not valid base64".to_string()))?;
    <[u8; 32]>::try_from(bytes.as_slice())
        .map_err(|_| VaultError::InvalidKey(format!("expected 32 bytes, got {}", bytes.len())))
}
