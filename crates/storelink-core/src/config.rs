//! Configuration management for storelink
//!
//! Settings are loaded from `.storelink/config.toml` when present and fall back
//! to defaults otherwise. `STORELINK_API_BASE_URL` and `STORELINK_ENV` override
//! the file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{Result, StoreLinkError};

/// Default location of the config file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = ".storelink/config.toml";

const BASE_URL_ENV: &str = "STORELINK_API_BASE_URL";
const ENVIRONMENT_ENV: &str = "STORELINK_ENV";

/// Top-level storelink configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreLinkConfig {
    /// Deployment environment
    #[serde(default)]
    pub environment: Environment,

    /// REST endpoint settings
    #[serde(default)]
    pub api: ApiSettings,

    /// Streaming and reconnect tuning
    #[serde(default)]
    pub sync: SyncSettings,
}

/// Deployment environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn is_development(self) -> bool {
        self == Environment::Development
    }
}

impl std::str::FromStr for Environment {
    type Err = StoreLinkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(StoreLinkError::Config(format!(
                "Unknown environment '{}'",
                other
            ))),
        }
    }
}

/// REST endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// API root, e.g. `http://localhost:5001/api`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout for one-shot requests (not applied to the stream)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Streaming and reconnect tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Delay before the first reconnect attempt
    #[serde(default = "default_initial_reconnect_delay_ms")]
    pub initial_reconnect_delay_ms: u64,

    /// Upper bound for the exponential backoff
    #[serde(default = "default_max_reconnect_delay_ms")]
    pub max_reconnect_delay_ms: u64,

    /// Consecutive failures before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay between the initial fetch and opening the stream
    #[serde(default = "default_startup_connect_delay_ms")]
    pub startup_connect_delay_ms: u64,
}

// Default value providers
fn default_base_url() -> String {
    "http://localhost:5001/api".to_string()
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_initial_reconnect_delay_ms() -> u64 {
    1000
}

fn default_max_reconnect_delay_ms() -> u64 {
    30_000
}

fn default_max_retries() -> u32 {
    5
}

fn default_startup_connect_delay_ms() -> u64 {
    500
}

impl StoreLinkConfig {
    /// Load configuration from `path` or use defaults, then apply env overrides
    pub fn load_or_default(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content).map_err(|e| {
                StoreLinkError::Config(format!("Failed to parse config file: {}", e))
            })?
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Self::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default configuration to `path`, creating parent directories
    pub fn write_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(&Self::default()).map_err(|e| {
            StoreLinkError::Config(format!("Failed to serialize config: {}", e))
        })?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Default config path
    pub fn default_path() -> PathBuf {
        PathBuf::from(DEFAULT_CONFIG_PATH)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            if !base_url.trim().is_empty() {
                self.api.base_url = base_url;
            }
        }
        if let Ok(environment) = std::env::var(ENVIRONMENT_ENV) {
            self.environment = environment.parse()?;
        }
        Ok(())
    }

    /// Check the reconnect tuning is usable
    pub fn validate(&self) -> Result<()> {
        let sync = &self.sync;
        if sync.max_retries == 0 {
            return Err(StoreLinkError::Config(
                "sync.max_retries must be at least 1".to_string(),
            ));
        }
        if sync.initial_reconnect_delay_ms == 0 {
            return Err(StoreLinkError::Config(
                "sync.initial_reconnect_delay_ms must be at least 1".to_string(),
            ));
        }
        if sync.max_reconnect_delay_ms < sync.initial_reconnect_delay_ms {
            return Err(StoreLinkError::Config(format!(
                "sync.max_reconnect_delay_ms ({}) is below sync.initial_reconnect_delay_ms ({})",
                sync.max_reconnect_delay_ms, sync.initial_reconnect_delay_ms
            )));
        }
        if self.api.base_url.trim().is_empty() {
            return Err(StoreLinkError::Config("api.base_url is empty".to_string()));
        }
        Ok(())
    }
}

impl ApiSettings {
    /// Base URL without a trailing slash
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// `GET`/`PUT` endpoint for the store configuration
    pub fn config_url(&self) -> String {
        format!("{}/store-config", self.base())
    }

    /// Server-sent-events endpoint for live updates
    pub fn stream_url(&self) -> String {
        format!("{}/store-config/sse", self.base())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl SyncSettings {
    pub fn initial_reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.initial_reconnect_delay_ms)
    }

    pub fn max_reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.max_reconnect_delay_ms)
    }

    pub fn startup_connect_delay(&self) -> Duration {
        Duration::from_millis(self.startup_connect_delay_ms)
    }
}

impl Default for StoreLinkConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            api: ApiSettings::default(),
            sync: SyncSettings::default(),
        }
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            initial_reconnect_delay_ms: default_initial_reconnect_delay_ms(),
            max_reconnect_delay_ms: default_max_reconnect_delay_ms(),
            max_retries: default_max_retries(),
            startup_connect_delay_ms: default_startup_connect_delay_ms(),
        }
    }
}
