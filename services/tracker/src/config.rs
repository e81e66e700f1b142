//! services/tracker/src/config.rs
//!
//! Defines the service's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub data_dir: PathBuf,
    pub region_store_key: String,
    pub visit_store_key: String,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server Settings ---
        let bind_address_str =
            lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Storage Settings ---
        let data_dir = lookup("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./public"));

        let region_store_key = store_key(&lookup, "REGION_STORE_KEY", "locationBoxes")?;
        let visit_store_key = store_key(&lookup, "VISIT_STORE_KEY", "locationTracking")?;
        if region_store_key == visit_store_key {
            return Err(ConfigError::InvalidValue(
                "VISIT_STORE_KEY".to_string(),
                "must differ from REGION_STORE_KEY".to_string(),
            ));
        }

        Ok(Self {
            bind_address,
            data_dir,
            region_store_key,
            visit_store_key,
            log_level,
        })
    }
}

/// Store keys become file names, so path separators are refused.
fn store_key<F>(lookup: &F, name: &str, default: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let key = lookup(name).unwrap_or_else(|| default.to_string());
    if key.is_empty() || key.contains(['/', '\\']) || key == "." || key == ".." {
        return Err(ConfigError::InvalidValue(
            name.to_string(),
            format!("'{}' is not a usable store name", key),
        ));
    }
    Ok(key)
}
