//! Server configuration
//!
//! Read from `$ATELIER_CONFIG`, or `atelier.toml` in the platform data
//! directory. A missing file means all defaults.

use std::path::{Path, PathBuf};

use atelier_core::{CatalogPolicy, FulfillmentPolicy, DEFAULT_TOKEN_TTL_HOURS};
use atelier_net::{ApiSettings, DEFAULT_BIND};
use directories::ProjectDirs;
use serde::Deserialize;
use tracing::info;

pub const CONFIG_ENV: &str = "ATELIER_CONFIG";

/// Upper bounds keep date and expiry arithmetic in range
const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365;
const MAX_UPCOMING_DAYS: i64 = 366;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid setting: {0}")]
    Invalid(String),

    #[error("Could not determine data directory")]
    NoDataDir,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Defaults to `atelier.db` in the data directory
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    pub token_ttl_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl_hours: DEFAULT_TOKEN_TTL_HOURS,
        }
    }
}

/// First admin account, created only while no admin exists
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BootstrapConfig {
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub catalog: CatalogPolicy,
    pub orders: FulfillmentPolicy,
    pub auth: AuthConfig,
    pub bootstrap: BootstrapConfig,
}

fn data_dir() -> Result<PathBuf, ConfigError> {
    let dirs = ProjectDirs::from("dev", "onyx", "atelier").ok_or(ConfigError::NoDataDir)?;
    Ok(dirs.data_dir().to_path_buf())
}

impl Config {
    /// Locate and load the config file
    pub fn load() -> Result<Self, ConfigError> {
        let path = match std::env::var_os(CONFIG_ENV) {
            Some(path) => PathBuf::from(path),
            None => data_dir()?.join("atelier.toml"),
        };
        Self::from_path(&path)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "Loaded config");
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_TOKEN_TTL_HOURS).contains(&self.auth.token_ttl_hours) {
            return Err(ConfigError::Invalid(format!(
                "auth.token_ttl_hours must be between 1 and {}",
                MAX_TOKEN_TTL_HOURS
            )));
        }
        if self.catalog.edit_lock_days < 0 {
            return Err(ConfigError::Invalid("catalog.edit_lock_days cannot be negative".into()));
        }
        if !(1..=MAX_UPCOMING_DAYS).contains(&self.catalog.upcoming_days) {
            return Err(ConfigError::Invalid(format!(
                "catalog.upcoming_days must be between 1 and {}",
                MAX_UPCOMING_DAYS
            )));
        }
        Ok(())
    }

    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.database.path {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("atelier.db")),
        }
    }

    pub fn api_settings(&self) -> ApiSettings {
        ApiSettings {
            catalog: self.catalog.clone(),
            fulfillment: self.orders.clone(),
            token_ttl_hours: self.auth.token_ttl_hours,
        }
    }
}
