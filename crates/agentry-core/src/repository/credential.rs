//! Credential repository and cipher trait definitions.

use std::future::Future;
use std::pin::Pin;

use agentry_types::credential::Credential;
use agentry_types::error::{RepositoryError, VaultError};

/// Read access to stored (still encrypted) credentials.
///
/// Credentials are written by the credential management endpoints, which
/// live outside this workspace. The orchestration core only reads them.
pub trait CredentialRepository: Send + Sync {
    /// Look up a credential by `(account_id, service_name)`.
    fn get_by_service(
        &self,
        account_id: i64,
        service_name: &str,
    ) -> impl std::future::Future<Output = Result<Option<Credential>, RepositoryError>> + Send;

    /// Look up a credential by id. Returns `None` when the credential exists
    /// but belongs to another account.
    fn get_by_id(
        &self,
        account_id: i64,
        credential_id: i64,
    ) -> impl std::future::Future<Output = Result<Option<Credential>, RepositoryError>> + Send;
}

/// Symmetric encryption of structured secrets.
///
/// Implemented by the AES-256-GCM vault in agentry-infra.
pub trait SecretCipher: Send + Sync {
    /// Encrypt a JSON secret under the current primary key.
    fn encrypt(&self, secret: &serde_json::Value) -> Result<String, VaultError>;

    /// Decrypt a ciphertext, trying the primary key and then every
    /// previous key in order.
    fn decrypt(&self, ciphertext: &str) -> Result<serde_json::Value, VaultError>;
}

/// Object-safe version of [`CredentialRepository`] with boxed futures.
///
/// Blanket-implemented for every `CredentialRepository` so the credential
/// service can hold one behind a trait object.
pub trait CredentialRepositoryDyn: Send + Sync {
    fn get_by_service_boxed<'a>(
        &'a self,
        account_id: i64,
        service_name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Credential>, RepositoryError>> + Send + 'a>>;

    fn get_by_id_boxed(
        &self,
        account_id: i64,
        credential_id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Credential>, RepositoryError>> + Send + '_>>;
}

impl<T: CredentialRepository> CredentialRepositoryDyn for T {
    fn get_by_service_boxed<'a>(
        &'a self,
        account_id: i64,
        service_name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Credential>, RepositoryError>> + Send + 'a>> {
        Box::pin(self.get_by_service(account_id, service_name))
    }

    fn get_by_id_boxed(
        &self,
        account_id: i64,
        credential_id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Credential>, RepositoryError>> + Send + '_>> {
        Box::pin(self.get_by_id(account_id, credential_id))
    }
}

/// Type-erased credential repository.
pub type DynCredentialRepository = Box<dyn CredentialRepositoryDyn>;
