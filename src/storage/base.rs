use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::{file_storage::FileStorage, memory_storage::MemoryStorage};
use crate::config::{StorageBackend, StorageConfig};
use crate::errors::StorageError;

/// Minimal string key-value capability the token store is built on.
///
/// Writes to different keys are independent; nothing here is transactional.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    /// Deleting an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
    /// Whether values outlive the process. Only reported in startup logs.
    fn is_durable(&self) -> bool {
        true
    }
}

/// Creates a concrete storage implementation based on the StorageConfig.
pub fn create_storage(config: &StorageConfig) -> Arc<dyn Storage> {
    match &config.backend {
        StorageBackend::Memory => {
            info!("Token storage is in memory; the session ends with the process.");
            Arc::new(MemoryStorage::new())
        }
        StorageBackend::File(file_config) => {
            info!(
                "Token storage is backed by '{}'.",
                file_config.path.display()
            );
            Arc::new(FileStorage::new(&file_config.path))
        }
    }
}
