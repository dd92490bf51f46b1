//! Cryptographic operations for Agentry.
//!
//! - `hash`: SHA-256 hashing of API keys
//! - `vault`: AES-256-GCM encryption of credentials at rest
//! - `rotation`: re-encryption of stored credentials under a new key

pub mod hash;
pub mod rotation;
pub mod vault;
