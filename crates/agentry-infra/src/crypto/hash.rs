//! SHA-256 hashing of API keys.
//!
//! API keys are never stored in clear; the `api_keys` table holds the
//! lowercase hex digest, and authentication compares digests.

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 digest of an API key.
pub fn hash_api_key(key: &str) -> String {
    format!("{:x}", Sha256::digest(key.as_bytes()))
}
