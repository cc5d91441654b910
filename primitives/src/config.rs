use std::time::Duration;

use once_cell::sync::Lazy;
use serde::Deserialize;
use thiserror::Error;

use crate::unit::UnitDefaults;

pub use toml::de::Error as TomlError;

pub static PRODUCTION_CONFIG: Lazy<Config> = Lazy::new(|| {
    Config::try_toml(include_str!("../../docs/config/prod.toml"))
        .expect("Failed to parse prod.toml config file")
});

pub static DEVELOPMENT_CONFIG: Lazy<Config> = Lazy::new(|| {
    Config::try_toml(include_str!("../../docs/config/dev.toml"))
        .expect("Failed to parse dev.toml config file")
});

#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "camelCase")]
/// The environment in which the application is running
/// Defaults to [`Environment::Development`]
pub enum Environment {
    /// The default development setup with a local Postgres & Redis.
    Development,
    Production,
}

impl Default for Environment {
    fn default() -> Self {
        Self::Development
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// For how long a cached entry is served without consulting the store.
    /// In milliseconds
    pub cache_freshness: u32,
    /// After how long the cache may evict an entry.
    /// In milliseconds
    pub cache_expiration: u32,
    /// Timeout for a single cache call, incl. the background writes.
    /// In milliseconds
    pub cache_timeout: u32,
    /// Timeout for a single store query when the request has no deadline of its own.
    /// In milliseconds
    pub store_timeout: u32,
    /// Maximum size of the Postgres connection pool
    pub store_pool_size: u32,
    /// Values for the nullable unit columns
    #[serde(default)]
    pub unit_defaults: UnitDefaults,
}

impl Config {
    /// Utility method that will deserialize a Toml file content into a [`Config`].
    ///
    /// Instead of relying on the `toml` crate directly, use this method instead.
    pub fn try_toml(toml: &str) -> Result<Self, TomlError> {
        toml::from_str(toml)
    }

    pub fn cache_freshness(&self) -> Duration {
        Duration::from_millis(self.cache_freshness.into())
    }

    pub fn cache_expiration(&self) -> Duration {
        Duration::from_millis(self.cache_expiration.into())
    }

    pub fn cache_timeout(&self) -> Duration {
        Duration::from_millis(self.cache_timeout.into())
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout.into())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Toml parsing: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("File reading: {0}")]
    InvalidFile(#[from] std::io::Error),
}

/// If no `config_file` path is provided it will load the [`Environment`] configuration.
/// If `config_file` path is provided it will try to read and parse the file in Toml format.
pub fn configuration(
    environment: Environment,
    config_file: Option<&str>,
) -> Result<Config, ConfigError> {
    match config_file {
        Some(config_file) => {
            let content = std::fs::read_to_string(config_file)?;

            Ok(Config::try_toml(&content)?)
        }
        None => match environment {
            Environment::Production => Ok(PRODUCTION_CONFIG.clone()),
            Environment::Development => Ok(DEVELOPMENT_CONFIG.clone()),
        },
    }
}
