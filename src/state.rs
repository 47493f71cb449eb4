use crate::core::db;
use crate::core::models::AppConfig;
use crate::core::storage::ConfigStorage;
use crate::core::traits::{DefaultStorageConfig, StorageConfig};
use crate::error::AppResult;
use crate::llm::{LlmClient, LlmSettings, LogStore};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state behind every handler.
pub struct AppState {
    pub storage: DefaultStorageConfig,
    pub db_pool: SqlitePool,
    pub llm: Arc<LlmClient>,
    pub log_store: Arc<LogStore>,
    pub config: RwLock<AppConfig>,
}

impl AppState {
    pub async fn new(settings: LlmSettings) -> AppResult<Self> {
        Self::build(DefaultStorageConfig::new()?, settings).await
    }

    pub async fn with_data_dir(data_dir: PathBuf, settings: LlmSettings) -> AppResult<Self> {
        Self::build(DefaultStorageConfig::with_path(data_dir)?, settings).await
    }

    async fn build(storage: DefaultStorageConfig, settings: LlmSettings) -> AppResult<Self> {
        let db_pool = db::init_db(&storage.data_dir()).await?;
        let config = ConfigStorage::load(&db_pool).await?;

        let log_store = Arc::new(LogStore::default());
        let llm = Arc::new(LlmClient::new(settings, log_store.clone()));

        // Persisted config wins over command-line defaults.
        if let Some(deployment) = &config.deployment {
            llm.set_deployment(deployment.clone());
        }
        llm.set_request_timeout(config.request_timeout);

        Ok(Self {
            storage,
            db_pool,
            llm,
            log_store,
            config: RwLock::new(config),
        })
    }
}
