//! Application state wiring the engine to its concrete adapters.
//!
//! The engine is generic over its repositories and model factory; the
//! aliases below pin those to the SQLite and HTTP implementations.

use std::sync::Arc;

use agentry_core::agent::engine::{CompletionEngine, EngineSettings};
use agentry_core::repository::credential::{DynCredentialRepository, SecretCipher};
use agentry_core::service::credential::CredentialService;
use agentry_infra::crypto::vault::CredentialVault;
use agentry_infra::llm::ProviderModelFactory;
use agentry_infra::sqlite::agent::SqliteAgentRepository;
use agentry_infra::sqlite::api_key::SqliteApiKeyRepository;
use agentry_infra::sqlite::chat::SqliteChatRepository;
use agentry_infra::sqlite::credential::SqliteCredentialRepository;
use agentry_infra::sqlite::pool::DatabasePool;
use agentry_infra::tools::{BuiltinToolDeps, builtin_registry};
use agentry_types::config::AppConfig;

pub type ConcreteEngine = CompletionEngine<SqliteAgentRepository, SqliteChatRepository, ProviderModelFactory>;

/// Shared state for HTTP handlers and CLI commands.
#[derive(Clone)]
pub struct AppState {
    pub engine: ConcreteEngine,
    pub chat: Arc<SqliteChatRepository>,
    pub api_keys: Arc<SqliteApiKeyRepository>,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Open the database, load vault keys from the environment and wire the engine.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        let db_pool = DatabasePool::new(&config.database_url).await?;
        let vault = Arc::new(CredentialVault::from_env()?);
        tracing::info!(keys = vault.key_count(), "credential vault ready");

        let http = reqwest::Client::builder().build()?;

        let credential_repo: DynCredentialRepository =
            Box::new(SqliteCredentialRepository::new(db_pool.clone()));
        let cipher: Arc<dyn SecretCipher> = vault;
        let credentials = Arc::new(CredentialService::new(credential_repo, cipher));

        let tools = builtin_registry(BuiltinToolDeps {
            http: http.clone(),
            pool: db_pool.clone(),
            config: Arc::clone(&config),
        });
        let models = ProviderModelFactory::new(http, config.ollama_base_url.clone());
        let chat = Arc::new(SqliteChatRepository::new(db_pool.clone()));

        let engine = CompletionEngine::new(
            Arc::new(SqliteAgentRepository::new(db_pool.clone())),
            Arc::clone(&chat),
            Arc::new(models),
            Arc::new(tools),
            credentials,
            EngineSettings::from(config.as_ref()),
        );

        Ok(Self {
            engine,
            chat,
            api_keys: Arc::new(SqliteApiKeyRepository::new(db_pool.clone())),
            db_pool,
        })
    }
}
