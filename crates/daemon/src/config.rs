//! Daemon configuration
//!
//! Layers, lowest precedence first: built-in defaults, the optional TOML
//! file, then `BOOTHLINE__SECTION__KEY` environment variables.

use anyhow::{Context, Result};
use boothline_core::application::constants::{
    DEFAULT_MAX_CONTENTION_RETRIES, DEFAULT_RETRY_BASE_DELAY_MS, DEFAULT_SERVICE_MINUTES,
    DEFAULT_SWEEP_INTERVAL,
};
use boothline_core::application::RetryConfig;
use boothline_core::domain::QueueSettings;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const CONFIG_PATH_ENV: &str = "BOOTHLINE_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "boothline.toml";
const ENV_PREFIX: &str = "BOOTHLINE";
const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub rpc: RpcSettings,
    pub engine: EngineSettings,
    pub sweeper: SweeperSettings,
    pub queue_defaults: QueueSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "sqlite://boothline.db".to_string(),
            max_connections: 8,
        }
    }
}

impl DatabaseSettings {
    /// `url` with a leading `~` in the path expanded
    pub fn expanded_url(&self) -> String {
        match self.url.strip_prefix("sqlite://") {
            Some(path) => format!("sqlite://{}", shellexpand::tilde(path)),
            None => shellexpand::tilde(&self.url).into_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcSettings {
    pub host: String,
    pub port: u16,
}

impl Default for RpcSettings {
    fn default() -> Self {
        let server = boothline_api_rpc::RpcServerConfig::default();
        Self {
            host: server.host,
            port: server.port,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub default_service_minutes: f64,
    pub max_contention_retries: u32,
    pub retry_base_delay_ms: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_service_minutes: DEFAULT_SERVICE_MINUTES,
            max_contention_retries: DEFAULT_MAX_CONTENTION_RETRIES,
            retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
        }
    }
}

impl EngineSettings {
    pub fn retry(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_contention_retries.max(1),
            base_delay_ms: self.retry_base_delay_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweeperSettings {
    pub interval_secs: u64,
}

impl Default for SweeperSettings {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_SWEEP_INTERVAL.as_secs(),
        }
    }
}

impl SweeperSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub format: LogFormat,
    pub filter: String,
    /// Daily-rolling log files are written here when set
    pub directory: Option<String>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            filter: "boothline=info".to_string(),
            directory: None,
        }
    }
}

impl Settings {
    /// Load from the file named by `BOOTHLINE_CONFIG` (or `boothline.toml`)
    /// and the process environment
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        let path = shellexpand::tilde(&path).into_owned();
        Self::load_from(Path::new(&path), Environment::default())
    }

    /// `env` is the environment source before prefix/separator are applied
    pub fn load_from(path: &Path, env: Environment) -> Result<Self> {
        let settings: Settings = Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(File::from(path).required(false))
            .add_source(
                env.prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read configuration ({})", path.display()))?
            .try_deserialize()
            .context("Invalid configuration")?;

        settings
            .queue_defaults
            .validate()
            .context("Invalid queue_defaults")?;
        let service = settings.engine.default_service_minutes;
        if service.is_nan() || service <= 0.0 {
            anyhow::bail!("engine.default_service_minutes must be positive");
        }
        Ok(settings)
    }
}
