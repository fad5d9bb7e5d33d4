use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use super::{file_store::FileStorage, memory_store::MemoryStorage};
use crate::config::{PersistenceConfig, StorageBackend};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(String),
    #[error("invalid storage key '{0}'")]
    InvalidKey(String),
    #[error("could not encode value: {0}")]
    Encode(String),
}

/// The Storage trait abstracts client-local durable key/value storage
/// (get, set, remove), the way a browser exposes local storage.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    /// Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
    /// Whether stored values survive a process restart.
    fn is_durable(&self) -> bool {
        true
    }
}

/// Creates a concrete storage implementation based on the PersistenceConfig.
pub fn create_storage(config: &PersistenceConfig) -> Arc<dyn Storage> {
    match &config.backend {
        StorageBackend::Memory => {
            info!("Session persistence uses process memory; nothing survives a restart.");
            Arc::new(MemoryStorage::new())
        }
        StorageBackend::File(file_config) => {
            info!(
                "Session persistence uses files under '{}'",
                file_config.directory.display()
            );
            Arc::new(FileStorage::new(file_config))
        }
    }
}
