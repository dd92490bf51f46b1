//! Key management commands: vault rotation, API key issuance, key generation.

use anyhow::Result;

use agentry_infra::crypto::rotation::rotate_credentials;
use agentry_infra::crypto::vault::CredentialVault;
use agentry_infra::sqlite::credential::SqliteCredentialRepository;

use crate::state::AppState;

pub async fn rotate_keys(state: &AppState, dry_run: bool, json: bool) -> Result<()> {
    let vault = CredentialVault::from_env()?;
    let repo = SqliteCredentialRepository::new(state.db_pool.clone());
    let report = rotate_credentials(&repo, &vault, dry_run).await?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "total": report.total,
                "rotated": report.rotated,
                "failed": report.failed,
                "dry_run": dry_run,
            })
        );
    } else {
        let verb = if dry_run { "would rotate" } else { "rotated" };
        println!("  {verb} {} of {} credentials", report.rotated, report.total);
        if !report.failed.is_empty() {
            println!("  undecryptable credential ids: {:?}", report.failed);
        }
    }

    if report.failed.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("{} credential(s) could not be decrypted with any configured key", report.failed.len())
    }
}

pub async fn create_api_key(state: &AppState, account_id: i64, name: &str, json: bool) -> Result<()> {
    let key = state.api_keys.create(account_id, name).await?;
    if json {
        println!("{}", serde_json::json!({"account_id": account_id, "name": name, "key": key}));
    } else {
        println!("  API key for account {account_id} ({name}):");
        println!("  {key}");
        println!("  Store it now; it cannot be shown again.");
    }
    Ok(())
}

pub fn generate_key(json: bool) {
    let key = CredentialVault::generate_key();
    if json {
        println!("{}", serde_json::json!({"key": key}));
    } else {
        println!("{key}");
    }
}
