//! Layered configuration for the worksheet engine and the tracing setup the
//! embedding process uses.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError};

const CONFIG_DIR: &str = "config";
const ENV_PREFIX: &str = "WORKSHEETS";
const ENV_SELECTOR: &str = "WORKSHEETS_ENV";
const FALLBACK_ENV: &str = "development";
const FALLBACK_DATABASE_URL: &str = "sqlite://worksheets.db?mode=rwc";
const FALLBACK_LOG_LEVEL: &str = "info";

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[validate(length(min = 1, message = "database_url must not be empty"))]
    pub database_url: String,

    /// Name of the deployment (`development`, `test`, `production`, ...).
    #[validate(length(min = 1))]
    pub environment: String,

    #[serde(default = "fallback_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Emit JSON log lines instead of the human readable format.
    #[serde(default)]
    pub log_json: bool,

    /// Apply pending schema migrations before serving any command.
    #[serde(default)]
    pub run_migrations: bool,

    #[serde(default)]
    #[validate]
    pub pool: PoolConfig,

    /// Bound of the channel events and notifications are published on.
    #[serde(default = "fallback_event_channel_capacity")]
    #[validate(range(min = 1, message = "event_channel_capacity must be greater than 0"))]
    pub event_channel_capacity: usize,
}

/// Connection pool sizing. Timeouts are whole seconds.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields, default)]
#[validate(schema(function = "validate_pool_bounds"))]
pub struct PoolConfig {
    #[validate(range(min = 1))]
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
            acquire_timeout_secs: 8,
        }
    }
}

impl PoolConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

impl AppConfig {
    /// A configuration with every optional value at its fallback.
    pub fn new(database_url: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            environment: environment.into(),
            log_level: fallback_log_level(),
            log_json: false,
            run_migrations: false,
            pool: PoolConfig::default(),
            event_channel_capacity: fallback_event_channel_capacity(),
        }
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Failed to read configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("Invalid configuration: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

impl From<AppConfigError> for crate::errors::ServiceError {
    fn from(err: AppConfigError) -> Self {
        crate::errors::ServiceError::ConfigError(err.to_string())
    }
}

fn fallback_log_level() -> String {
    FALLBACK_LOG_LEVEL.to_owned()
}

fn fallback_event_channel_capacity() -> usize {
    1024
}

fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    level.parse::<tracing::Level>().map(|_| ()).map_err(|_| {
        let mut err = ValidationError::new("log_level");
        err.message = Some(format!("unknown log level '{}'", level).into());
        err
    })
}

fn validate_pool_bounds(pool: &PoolConfig) -> Result<(), ValidationError> {
    if pool.min_connections > pool.max_connections {
        let mut err = ValidationError::new("pool_bounds");
        err.message = Some("min_connections can't exceed max_connections".into());
        return Err(err);
    }
    Ok(())
}

/// Installs the global subscriber. `RUST_LOG` wins over `level` when set.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("stateset_worksheets={},sea_orm=warn", level)));
    let builder = fmt().with_env_filter(filter).with_target(true);

    // A second call (tests, embedding apps) keeps the first subscriber.
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

/// Loads configuration from `./config`.
///
/// Sources, later ones winning: fallbacks, `config/default.*`,
/// `config/{WORKSHEETS_ENV}.*`, then `WORKSHEETS__*` environment variables
/// (`WORKSHEETS__POOL__MAX_CONNECTIONS=4`).
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    load_config_from(CONFIG_DIR)
}

pub fn load_config_from(config_dir: &str) -> Result<AppConfig, AppConfigError> {
    let environment = std::env::var(ENV_SELECTOR).unwrap_or_else(|_| FALLBACK_ENV.to_owned());
    if !Path::new(config_dir).is_dir() {
        info!(config_dir, "No config directory, using fallbacks and environment");
    }

    let app_config: AppConfig = Config::builder()
        .set_default("database_url", FALLBACK_DATABASE_URL)?
        .set_default("environment", environment.as_str())?
        .add_source(File::with_name(&format!("{}/default", config_dir)).required(false))
        .add_source(File::with_name(&format!("{}/{}", config_dir, environment)).required(false))
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()?
        .try_deserialize()?;

    if let Err(e) = app_config.validate() {
        error!(error = %e, "Rejected configuration");
        return Err(e.into());
    }

    info!(environment = %app_config.environment, "Configuration loaded");
    Ok(app_config)
}
