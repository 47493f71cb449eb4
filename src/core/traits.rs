//! Storage-location abstraction, kept separate from the web runtime so the
//! data directory can be swapped in tests.

use crate::error::{AppError, AppResult};
use std::path::PathBuf;

pub trait StorageConfig: Send + Sync {
    /// Data directory holding the database.
    fn data_dir(&self) -> PathBuf;
}

/// Default storage under `~/.rehabilitia/`.
pub struct DefaultStorageConfig {
    data_dir: PathBuf,
}

impl DefaultStorageConfig {
    pub fn new() -> AppResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| AppError::Unknown("could not resolve home directory".to_string()))?;
        Self::with_path(home.join(".rehabilitia"))
    }

    pub fn with_path(data_dir: PathBuf) -> AppResult<Self> {
        std::fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }
}

impl StorageConfig for DefaultStorageConfig {
    fn data_dir(&self) -> PathBuf {
        self.data_dir.clone()
    }
}
