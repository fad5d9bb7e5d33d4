use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Where the user record and bearer token survive restarts.
/// - user_key / token_key: the storage keys.
/// - backend: the storage backend, selected by a "type" tag in the YAML.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct PersistenceConfig {
    #[serde(default = "default_user_key")]
    pub user_key: String,
    #[serde(default = "default_token_key")]
    pub token_key: String,
    #[serde(flatten)]
    pub backend: StorageBackend,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        PersistenceConfig {
            user_key: default_user_key(),
            token_key: default_token_key(),
            backend: StorageBackend::Memory,
        }
    }
}

/// The existing storage backends.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
#[serde(tag = "type")]
pub enum StorageBackend {
    /// Lives as long as the process; nothing survives a restart.
    #[serde(rename = "memory")]
    Memory,
    #[serde(rename = "file")]
    File(FileStorageConfig),
}

/// One JSON file per key under `directory`.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct FileStorageConfig {
    pub directory: PathBuf,
}

fn default_user_key() -> String {
    "user".to_string()
}

fn default_token_key() -> String {
    "accessToken".to_string()
}
