use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::config::StorageConfig;
use crate::errors::StorageError;
use crate::models::TokenPair;
use crate::storage::Storage;

/// Persists the current token pair under two configurable keys.
///
/// The two writes are independent. A process killed between them can leave
/// only one key behind; `load` then reports no pair.
///
/// Clones share one write lock, so a pair installed by login, cleared by
/// logout or committed by a refresh never interleaves with another.
#[derive(Clone)]
pub struct TokenStore {
    storage: Arc<dyn Storage>,
    access_key: String,
    refresh_key: String,
    writes: Arc<Mutex<()>>,
}

/// Held while a refresh outcome is published; the pair cannot change meanwhile.
pub type PairGuard<'a> = MutexGuard<'a, ()>;

impl TokenStore {
    pub fn new(
        storage: Arc<dyn Storage>,
        access_key: impl Into<String>,
        refresh_key: impl Into<String>,
    ) -> Self {
        TokenStore {
            storage,
            access_key: access_key.into(),
            refresh_key: refresh_key.into(),
            writes: Arc::new(Mutex::new(())),
        }
    }

    pub fn from_config(storage: Arc<dyn Storage>, config: &StorageConfig) -> Self {
        Self::new(
            storage,
            config.access_token_key.clone(),
            config.refresh_token_key.clone(),
        )
    }

    pub async fn save(&self, pair: &TokenPair) -> Result<(), StorageError> {
        let _guard = self.writes.lock().await;
        self.write_pair(&pair.access, Some(&pair.refresh)).await?;
        debug!("Token pair saved");
        Ok(())
    }

    /// Stores a refreshed access token, and the rotated refresh token if the
    /// backend issued one, provided `used_refresh` is still the stored refresh
    /// token. Returns `None` without writing when the pair was cleared or
    /// replaced while the refresh was outstanding.
    pub async fn commit_refresh(
        &self,
        used_refresh: &str,
        access: &str,
        rotated: Option<&str>,
    ) -> Result<Option<PairGuard<'_>>, StorageError> {
        let guard = self.writes.lock().await;
        if self.refresh_token().await?.as_deref() != Some(used_refresh) {
            return Ok(None);
        }
        self.write_pair(access, rotated).await?;
        debug!("Refreshed token committed");
        Ok(Some(guard))
    }

    /// Clears the pair after a failed refresh, unless the stored refresh
    /// token is no longer `used_refresh` (`None` when there was none).
    pub async fn clear_if_current(
        &self,
        used_refresh: Option<&str>,
    ) -> Result<Option<PairGuard<'_>>, StorageError> {
        let guard = self.writes.lock().await;
        if self.refresh_token().await?.as_deref() != used_refresh {
            return Ok(None);
        }
        self.delete_pair().await?;
        Ok(Some(guard))
    }

    pub async fn load(&self) -> Result<Option<TokenPair>, StorageError> {
        let access = self.access_token().await?;
        let refresh = self.refresh_token().await?;
        Ok(match (access, refresh) {
            (Some(access), Some(refresh)) => Some(TokenPair { access, refresh }),
            _ => None,
        })
    }

    pub async fn access_token(&self) -> Result<Option<String>, StorageError> {
        self.storage.get(&self.access_key).await
    }

    pub async fn refresh_token(&self) -> Result<Option<String>, StorageError> {
        self.storage.get(&self.refresh_key).await
    }

    pub async fn clear(&self) -> Result<(), StorageError> {
        let _guard = self.writes.lock().await;
        self.delete_pair().await
    }

    async fn write_pair(&self, access: &str, refresh: Option<&str>) -> Result<(), StorageError> {
        self.storage.set(&self.access_key, access).await?;
        if let Some(refresh) = refresh {
            self.storage.set(&self.refresh_key, refresh).await?;
        }
        Ok(())
    }

    async fn delete_pair(&self) -> Result<(), StorageError> {
        self.storage.delete(&self.access_key).await?;
        self.storage.delete(&self.refresh_key).await?;
        debug!("Token pair cleared");
        Ok(())
    }
}
