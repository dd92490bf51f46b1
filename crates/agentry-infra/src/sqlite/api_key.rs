//! API key storage.
//!
//! Only the SHA-256 hash of a key is stored. The plaintext is returned once,
//! from [`SqliteApiKeyRepository::create`].

use aes_gcm::aead::OsRng;
use aes_gcm::aead::rand_core::RngCore;
use agentry_types::error::RepositoryError;
use chrono::Utc;

use super::format_datetime;
use super::pool::DatabasePool;
use crate::crypto::hash::hash_api_key;

/// Prefix of generated keys, so leaked keys are recognisable.
pub const API_KEY_PREFIX: &str = "agry_";

pub struct SqliteApiKeyRepository {
    pool: DatabasePool,
}

impl SqliteApiKeyRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Resolve a presented key to its account id.
    ///
    /// Touches `last_used_at` on success; failing to do so does not fail
    /// the lookup.
    pub async fn authenticate(&self, key: &str) -> Result<Option<i64>, RepositoryError> {
        let key_hash = hash_api_key(key);
        let row: Option<(i64, i64)> =
            sqlx::query_as("SELECT id, account_id FROM api_keys WHERE key_hash = ?")
                .bind(&key_hash)
                .fetch_optional(&self.pool.reader)
                .await
                .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let Some((id, account_id)) = row else {
            return Ok(None);
        };

        if let Err(e) = sqlx::query("UPDATE api_keys SET last_used_at = ? WHERE id = ?")
            .bind(format_datetime(&Utc::now()))
            .bind(id)
            .execute(&self.pool.writer)
            .await
        {
            tracing::debug!(error = %e, key_id = id, "failed to update api key last_used_at");
        }

        Ok(Some(account_id))
    }

    /// Generate a key for `account_id` and store its hash. Returns the
    /// plaintext key.
    pub async fn create(&self, account_id: i64, name: &str) -> Result<String, RepositoryError> {
        let mut key_bytes = [0u8; 32];
        OsRng.fill_bytes(&mut key_bytes);
        let plaintext = format!(
            "{API_KEY_PREFIX}{}",
            key_bytes.iter().map(|b| format!("{b:02x}")).collect::<String>()
        );

        sqlx::query("INSERT INTO api_keys (account_id, key_hash, name, created_at) VALUES (?, ?, ?, ?)")
            .bind(account_id)
            .bind(hash_api_key(&plaintext))
            .bind(name)
            .bind(format_datetime(&Utc::now()))
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        tracing::info!(account_id, name, "created api key");
        Ok(plaintext)
    }
}
