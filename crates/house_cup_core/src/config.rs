//! Layered runtime configuration.
//!
//! Sources, highest priority last:
//! 1. Built-in defaults
//! 2. `house_cup.toml` in the working directory, when present
//! 3. `HOUSE_CUP_*` environment variables, `__` separating sections
//!    (`HOUSE_CUP_DATABASE__POOL_SIZE` -> `database.pool_size`)

use crate::db::PoolOptions;
use crate::logging::{default_log_level, normalize_level};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "house_cup.toml";
pub const ENV_PREFIX: &str = "HOUSE_CUP_";

#[derive(Debug)]
pub enum ConfigError {
    Figment(Box<figment::Error>),
    InvalidValue { field: &'static str, reason: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Figment(err) => write!(f, "configuration error: {err}"),
            Self::InvalidValue { field, reason } => {
                write!(f, "invalid configuration value for `{field}`: {reason}")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Figment(err) => Some(err.as_ref()),
            Self::InvalidValue { .. } => None,
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(value: figment::Error) -> Self {
        Self::Figment(Box::new(value))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// SQLite file path; `:memory:` selects a private in-memory store.
    pub path: String,
    pub pool_size: usize,
    pub busy_timeout_ms: u64,
    pub checkout_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let pool = PoolOptions::default();
        Self {
            path: "house_cup.db".to_string(),
            pool_size: pool.size,
            busy_timeout_ms: millis(pool.busy_timeout),
            checkout_timeout_ms: millis(pool.checkout_timeout),
        }
    }
}

impl DatabaseConfig {
    pub fn is_in_memory(&self) -> bool {
        self.path.trim() == ":memory:"
    }

    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            size: self.pool_size,
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
            checkout_timeout: Duration::from_millis(self.checkout_timeout_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    /// Absolute directory for rolling log files; file logging is off when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            dir: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct HouseCupConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl HouseCupConfig {
    /// Loads and validates configuration from every source.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment())
    }

    /// Loads configuration with an explicit TOML file instead of the default
    /// `house_cup.toml` lookup. The file must exist.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConfigError::InvalidValue {
                field: "config_file",
                reason: format!("`{}` does not exist", path.display()),
            });
        }
        let figment = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::from_figment(figment)
    }

    /// Provider chain used by [`HouseCupConfig::load`].
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        let local_path = PathBuf::from(CONFIG_FILE_NAME);
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.path.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "database.path",
                reason: "must not be empty".to_string(),
            });
        }
        if self.database.pool_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "database.pool_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.database.checkout_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "database.checkout_timeout_ms",
                reason: "must be at least 1".to_string(),
            });
        }
        normalize_level(&self.logging.level).map_err(|reason| ConfigError::InvalidValue {
            field: "logging.level",
            reason,
        })?;
        if let Some(dir) = &self.logging.dir {
            if !dir.is_absolute() {
                return Err(ConfigError::InvalidValue {
                    field: "logging.dir",
                    reason: format!("must be an absolute path, got `{}`", dir.display()),
                });
            }
        }
        Ok(())
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
