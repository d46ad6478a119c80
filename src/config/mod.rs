//! Client configuration: backend location, token persistence, the brokerage
//! linking page and logging.

pub mod logging;
pub mod storage;
pub mod types;

pub use logging::LoggingConfig;
pub use storage::{FileStorageConfig, StorageBackend, StorageConfig};
pub use types::{load_config, load_config_from_str, print_schema, ApiConfig, BrokerConfig, Config, ConfigV1};
