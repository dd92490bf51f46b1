//! Configuration loader for Agentry.
//!
//! Reads `agentry.toml` and deserializes it into [`AppConfig`]. Falls back to
//! defaults when the file is missing or malformed, then applies environment
//! overrides.

use std::path::{Path, PathBuf};

use agentry_types::config::AppConfig;

pub const CONFIG_FILE_NAME: &str = "agentry.toml";

/// Default config location: `./agentry.toml` if present, otherwise
/// `{config_dir}/agentry/agentry.toml`.
pub fn default_config_path() -> PathBuf {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return local;
    }
    dirs::config_dir()
        .map(|dir| dir.join("agentry").join(CONFIG_FILE_NAME))
        .unwrap_or(local)
}

/// Load configuration from `path` and apply environment overrides.
///
/// - Missing file: defaults.
/// - Unreadable or unparseable file: logs a warning, defaults.
pub async fn load_config(path: &Path) -> AppConfig {
    let config = read_config_file(path).await;
    apply_env_overrides(config, |key| std::env::var(key).ok())
}

async fn read_config_file(path: &Path) -> AppConfig {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return AppConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", path.display());
            return AppConfig::default();
        }
    };

    match toml::from_str::<AppConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", path.display());
            AppConfig::default()
        }
    }
}

/// Override file values with environment variables read through `lookup`.
///
/// Empty values are ignored. An unparseable `AGENTRY_MAX_ITERATIONS` logs a
/// warning and keeps the file value.
pub fn apply_env_overrides<F>(mut config: AppConfig, lookup: F) -> AppConfig
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = get("AGENTRY_DATABASE_URL") {
        config.database_url = url;
    }
    if let Some(url) = get("EMBEDDINGS_API_URL") {
        config.embeddings_api_url = Some(url);
    }
    if let Some(url) = get("RERANKER_API_URL") {
        config.reranker_api_url = Some(url);
    }
    if let Some(url) = get("OLLAMA_BASE_URL") {
        config.ollama_base_url = url;
    }
    if let Some(url) = get("PINECONE_CONTROL_URL") {
        config.pinecone_control_url = url;
    }
    if let Some(raw) = get("AGENTRY_MAX_ITERATIONS") {
        match raw.trim().parse::<u32>() {
            Ok(n) => config.max_iterations = n,
            Err(_) => tracing::warn!(value = %raw, "ignoring invalid AGENTRY_MAX_ITERATIONS"),
        }
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = read_config_file(&tmp.path().join(CONFIG_FILE_NAME)).await;
        assert_eq!(config.max_iterations, 10);
        assert!(config.embeddings_api_url.is_none());
    }

    #[tokio::test]
    async fn valid_toml_is_parsed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        tokio::fs::write(
            &path,
            r#"
database_url = "sqlite:///var/lib/agentry.db"
reranker_api_url = "http://rerank.local"
max_tokens = 2048
"#,
        )
        .await
        .unwrap();

        let config = read_config_file(&path).await;
        assert_eq!(config.database_url, "sqlite:///var/lib/agentry.db");
        assert_eq!(config.reranker_api_url.as_deref(), Some("http://rerank.local"));
        assert_eq!(config.max_tokens, 2048);
    }

    #[tokio::test]
    async fn invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        tokio::fs::write(&path, "this is not { valid toml !!!").await.unwrap();

        let config = read_config_file(&path).await;
        assert_eq!(config.max_tokens, 4096);
    }

    #[test]
    fn env_overrides_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("EMBEDDINGS_API_URL", "http://embed.env"),
            ("OLLAMA_BASE_URL", "http://gpu-box:11434"),
            ("AGENTRY_MAX_ITERATIONS", "3"),
            ("RERANKER_API_URL", ""),
        ]);
        let config = apply_env_overrides(AppConfig::default(), |k| {
            env.get(k).map(|v| v.to_string())
        });
        assert_eq!(config.embeddings_api_url.as_deref(), Some("http://embed.env"));
        assert_eq!(config.ollama_base_url, "http://gpu-box:11434");
        assert_eq!(config.max_iterations, 3);
        assert!(config.reranker_api_url.is_none());
    }

    #[test]
    fn invalid_max_iterations_keeps_value() {
        let config = apply_env_overrides(AppConfig::default(), |k| {
            (k == "AGENTRY_MAX_ITERATIONS").then(|| "many".to_string())
        });
        assert_eq!(config.max_iterations, 10);
    }
}
