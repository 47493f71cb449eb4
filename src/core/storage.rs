//! Runtime config persistence in the `configs` table.

use crate::core::models::AppConfig;
use crate::error::AppResult;
use sqlx::{Row, SqlitePool};

pub struct ConfigStorage;

impl ConfigStorage {
    /// Loads the persisted config, writing back the defaults on first run.
    pub async fn load(pool: &SqlitePool) -> AppResult<AppConfig> {
        let row = sqlx::query("SELECT value FROM configs WHERE key = 'app_config'")
            .fetch_optional(pool)
            .await?;

        if let Some(row) = row {
            let value: String = row.get("value");
            let config: AppConfig = serde_json::from_str(&value)?;
            return Ok(config);
        }

        let default_config = AppConfig::default();
        Self::save(pool, &default_config).await?;
        Ok(default_config)
    }

    pub async fn save(pool: &SqlitePool, config: &AppConfig) -> AppResult<()> {
        let content = serde_json::to_string_pretty(config)?;

        sqlx::query(
            "INSERT INTO configs (key, value) VALUES ('app_config', ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(content)
        .execute(pool)
        .await?;

        Ok(())
    }
}
