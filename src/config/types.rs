use std::path::Path;

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use url::Url;

use super::logging::LoggingConfig;
use super::storage::StorageConfig;
use crate::errors::ConfigError;

/// A top-level enum for versioned configurations.
#[derive(Deserialize, Serialize, JsonSchema)]
#[serde(tag = "version")]
pub enum Config {
    #[serde(rename = "1.0.0")]
    ConfigV1(ConfigV1),
}

/// Main config for v1.0.0: backend location, token persistence, broker page, logging.
#[derive(Deserialize, Serialize, Debug, Clone, Default, JsonSchema)]
pub struct ConfigV1 {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Load config from the given YAML file, layered over the built-in defaults
/// and overridden by `TRADEBIT_*` environment variables (`__` separates levels).
/// A missing file is not an error; the defaults apply.
pub fn load_config(path: &Path) -> Result<ConfigV1, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::default("version", "1.0.0"))
        .merge(Yaml::file(path))
        .merge(Env::prefixed("TRADEBIT_").split("__"));
    parse_config(figment)
}

/// Parse a configuration held in a string; used by tests and embedders.
pub fn load_config_from_str(yaml: &str) -> Result<ConfigV1, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::default("version", "1.0.0"))
        .merge(Yaml::string(yaml));
    parse_config(figment)
}

fn parse_config(figment: Figment) -> Result<ConfigV1, ConfigError> {
    let config = figment.extract::<Config>().map_err(Box::new)?;
    let config = match config {
        Config::ConfigV1(c) => c,
    };
    config.validate()?;
    Ok(config)
}

/// Print the JSON schema for the configuration to stdout.
pub fn print_schema() -> Result<(), serde_json::Error> {
    let schema = schema_for!(Config);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

impl ConfigV1 {
    fn validate(&self) -> Result<(), ConfigError> {
        let base = Url::parse(&self.api.base_url)
            .map_err(|_| ConfigError::InvalidBaseUrl(self.api.base_url.clone()))?;
        if base.cannot_be_a_base() {
            return Err(ConfigError::InvalidBaseUrl(self.api.base_url.clone()));
        }
        Url::parse(&self.broker.link_page_url)?;
        Ok(())
    }
}

/// Where the backend lives and how long a single call may take.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_in_ms")]
    pub timeout_in_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: default_base_url(),
            timeout_in_ms: default_timeout_in_ms(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000/api/v1".to_string()
}

fn default_timeout_in_ms() -> u64 {
    30_000
}

/// The client page the brokerage redirects back to after its login.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct BrokerConfig {
    #[serde(default = "default_link_page_url")]
    pub link_page_url: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        BrokerConfig {
            link_page_url: default_link_page_url(),
        }
    }
}

fn default_link_page_url() -> String {
    "http://localhost:3000/zerodha".to_string()
}
