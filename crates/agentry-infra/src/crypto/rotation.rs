//! Re-encrypt every stored credential under the current primary key.
//!
//! Run after moving the old key into `CREDENTIALS_ENCRYPTION_KEY_OLD` and
//! installing a new `CREDENTIALS_ENCRYPTION_KEY`. Credentials that no
//! configured key can decrypt are reported and left untouched.

use agentry_types::error::RepositoryError;

use super::vault::CredentialVault;
use crate::sqlite::credential::SqliteCredentialRepository;

/// Outcome of a rotation pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RotationReport {
    pub total: usize,
    pub rotated: usize,
    /// Ids of credentials no configured key could decrypt.
    pub failed: Vec<i64>,
}

/// Rotate every credential. With `dry_run`, ciphertexts are checked but
/// nothing is written.
pub async fn rotate_credentials(
    repo: &SqliteCredentialRepository,
    vault: &CredentialVault,
    dry_run: bool,
) -> Result<RotationReport, RepositoryError> {
    let credentials = repo.list_all().await?;
    let mut report = RotationReport {
        total: credentials.len(),
        ..RotationReport::default()
    };

    for credential in credentials {
        let rotated = match vault.rotate(&credential.encrypted_data) {
            Ok(ciphertext) => ciphertext,
            Err(e) => {
                tracing::warn!(credential_id = credential.id, error = %e, "cannot decrypt credential");
                report.failed.push(credential.id);
                continue;
            }
        };
        if !dry_run {
            repo.update_encrypted_data(credential.id, &rotated).await?;
        }
        report.rotated += 1;
    }

    tracing::info!(
        total = report.total,
        rotated = report.rotated,
        failed = report.failed.len(),
        dry_run,
        "credential rotation finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::pool::tests::{insert_account, test_pool};
    use agentry_types::credential::CredentialType;
    use serde_json::json;

    #[tokio::test]
    async fn test_rotation_moves_credentials_to_new_key() {
        let (pool, _dir) = test_pool().await;
        let account = insert_account(&pool, "alice@example.com").await;
        let repo = SqliteCredentialRepository::new(pool.clone());

        let old = CredentialVault::new(&[1u8; 32], &[]);
        let stranger = CredentialVault::new(&[9u8; 32], &[]);
        let secret = json!({"api_key": "sk-live"});
        let good = repo
            .store(account, "OPENAI_API_KEY", &CredentialType::ApiKey, &old.encrypt_value(&secret).unwrap(), &json!({}))
            .await
            .unwrap();
        let lost = repo
            .store(account, "PINECONE_API_KEY", &CredentialType::ApiKey, &stranger.encrypt_value(&secret).unwrap(), &json!({}))
            .await
            .unwrap();

        let new = CredentialVault::new(&[2u8; 32], &[[1u8; 32]]);

        let dry = rotate_credentials(&repo, &new, true).await.unwrap();
        assert_eq!(dry, RotationReport { total: 2, rotated: 1, failed: vec![lost] });
        let untouched = repo.list_all().await.unwrap();
        assert!(old.decrypt_value(&untouched[0].encrypted_data).is_ok());

        let report = rotate_credentials(&repo, &new, false).await.unwrap();
        assert_eq!(report.rotated, 1);

        let stored = repo.list_all().await.unwrap();
        let rotated = stored.iter().find(|c| c.id == good).unwrap();
        let only_new = CredentialVault::new(&[2u8; 32], &[]);
        assert_eq!(only_new.decrypt_value(&rotated.encrypted_data).unwrap(), secret);
    }
}
