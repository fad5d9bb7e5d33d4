use std::sync::Arc;

use tracing::warn;

use crate::config::PersistenceConfig;
use crate::models::UserRecord;
use crate::store::{Storage, StoreError};

/// What storage holds under the user key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistedUser {
    Absent,
    Present(UserRecord),
    /// Something is stored but it does not parse as a user record.
    Corrupt,
}

/// Durable mirror of the session: the user record and the bearer token,
/// each under its own key.
pub struct PersistedSession {
    storage: Arc<dyn Storage>,
    user_key: String,
    token_key: String,
}

impl PersistedSession {
    pub fn new(storage: Arc<dyn Storage>, config: &PersistenceConfig) -> Self {
        PersistedSession {
            storage,
            user_key: config.user_key.clone(),
            token_key: config.token_key.clone(),
        }
    }

    pub async fn load_user(&self) -> Result<PersistedUser, StoreError> {
        match self.storage.get(&self.user_key).await? {
            None => Ok(PersistedUser::Absent),
            Some(raw) => match UserRecord::from_json(&raw) {
                Ok(user) => Ok(PersistedUser::Present(user)),
                Err(e) => {
                    warn!("Persisted user under '{}' is unreadable: {}", self.user_key, e);
                    Ok(PersistedUser::Corrupt)
                }
            },
        }
    }

    /// Whether the backing storage outlives the process.
    pub fn is_durable(&self) -> bool {
        self.storage.is_durable()
    }

    pub async fn save_user(&self, user: &UserRecord) -> Result<(), StoreError> {
        let raw = user
            .to_json()
            .map_err(|e| StoreError::Encode(e.to_string()))?;
        self.storage.set(&self.user_key, &raw).await
    }

    pub async fn clear_user(&self) -> Result<(), StoreError> {
        self.storage.remove(&self.user_key).await
    }

    pub async fn load_token(&self) -> Result<Option<String>, StoreError> {
        self.storage.get(&self.token_key).await
    }

    pub async fn save_token(&self, token: &str) -> Result<(), StoreError> {
        self.storage.set(&self.token_key, token).await
    }

    pub async fn clear_token(&self) -> Result<(), StoreError> {
        self.storage.remove(&self.token_key).await
    }
}
