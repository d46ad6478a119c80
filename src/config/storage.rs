use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Where the token pair lives between runs, and under which keys.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct StorageConfig {
    #[serde(flatten)]
    pub backend: StorageBackend,
    #[serde(default = "default_access_token_key")]
    pub access_token_key: String,
    #[serde(default = "default_refresh_token_key")]
    pub refresh_token_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            backend: StorageBackend::File(FileStorageConfig::default()),
            access_token_key: default_access_token_key(),
            refresh_token_key: default_refresh_token_key(),
        }
    }
}

/// The existing storage backends. We differentiate them via a "type" tag in the YAML.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
#[serde(tag = "type")]
pub enum StorageBackend {
    #[serde(rename = "memory")]
    Memory,
    #[serde(rename = "file")]
    File(FileStorageConfig),
}

#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct FileStorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

impl Default for FileStorageConfig {
    fn default() -> Self {
        FileStorageConfig {
            path: default_storage_path(),
        }
    }
}

fn default_storage_path() -> PathBuf {
    PathBuf::from(".tradebit/session.json")
}

fn default_access_token_key() -> String {
    "tradebit_auth_token".to_string()
}

fn default_refresh_token_key() -> String {
    "tradebit_refresh_token".to_string()
}
