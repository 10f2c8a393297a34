//! SDK configuration
//!
//! Settings come from a YAML file; the access token never lives there and
//! is read from `UOF_TOKEN` (a `.env` file is honoured).

use super::environment::Environment;
use super::logging::init_tracing_with_level;
use super::rate_limit::DEFAULT_CONCURRENT_API_CALLS;
use crate::domain::{Lang, Producer};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use feedlink::ConnectionParams;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

pub const TOKEN_VAR: &str = "UOF_TOKEN";
pub const BOOKMAKER_ID_VAR: &str = "UOF_BOOKMAKER_ID";
pub const NODE_ID_VAR: &str = "UOF_NODE_ID";
pub const ENV_VAR: &str = "UOF_ENV";
pub const LANGS_VAR: &str = "UOF_LANGS";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarMissing(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Producer to manage, with the last timestamp the embedder processed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoverySeed {
    pub producer: Producer,
    /// Milliseconds since epoch, 0 for a full snapshot
    #[serde(default)]
    pub timestamp: i64,
}

impl RecoverySeed {
    pub fn new(producer: Producer, timestamp: i64) -> Self {
        Self { producer, timestamp }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdkConfig {
    #[serde(default)]
    pub environment: Environment,
    pub bookmaker_id: u64,
    #[serde(default)]
    pub node_id: Option<i64>,
    /// First language is the primary one
    #[serde(default = "default_languages")]
    pub languages: Vec<Lang>,
    /// Managed producers; empty means live odds and prematch from scratch
    #[serde(default)]
    pub recovery: Vec<RecoverySeed>,
    /// Preload fixtures starting within this many hours
    #[serde(default)]
    pub preload_hours: Option<u64>,
    #[serde(default = "default_concurrent_api_calls")]
    pub concurrent_api_calls: usize,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// TLS server name override for the broker
    #[serde(default)]
    pub server_name: Option<String>,

    /// Access token from .env (not in YAML)
    #[serde(skip)]
    pub token: String,
}

fn default_languages() -> Vec<Lang> {
    vec![Lang::En]
}

fn default_concurrent_api_calls() -> usize {
    DEFAULT_CONCURRENT_API_CALLS
}

pub(crate) fn default_channel_capacity() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

impl SdkConfig {
    /// Load configuration from YAML file, token from the environment
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self> {
        let yaml_content = std::fs::read_to_string(config_path)?;
        let mut config = Self::from_yaml(&yaml_content)?;

        dotenv::dotenv().ok();
        config.token = std::env::var(TOKEN_VAR)
            .map_err(|_| ConfigError::EnvVarMissing(TOKEN_VAR.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Parse YAML without touching the environment; the token stays empty
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Build a configuration from `UOF_*` environment variables
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from any variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::EnvVarMissing(name.to_string()))
        };

        let token = required(TOKEN_VAR)?;
        let bookmaker_id = required(BOOKMAKER_ID_VAR)?
            .parse()
            .map_err(|_| ConfigError::ValidationError(format!("{} must be a number", BOOKMAKER_ID_VAR)))?;
        let node_id = match lookup(NODE_ID_VAR).filter(|v| !v.is_empty()) {
            Some(raw) => Some(raw.parse().map_err(|_| {
                ConfigError::ValidationError(format!("{} must be a number", NODE_ID_VAR))
            })?),
            None => None,
        };
        let environment = match lookup(ENV_VAR).filter(|v| !v.is_empty()) {
            Some(raw) => raw.parse().map_err(ConfigError::ValidationError)?,
            None => Environment::default(),
        };
        let languages = match lookup(LANGS_VAR).filter(|v| !v.is_empty()) {
            Some(raw) => Lang::parse_list(&raw).map_err(ConfigError::ValidationError)?,
            None => default_languages(),
        };

        let config = SdkConfig {
            environment,
            bookmaker_id,
            node_id,
            languages,
            recovery: Vec::new(),
            preload_hours: None,
            concurrent_api_calls: default_concurrent_api_calls(),
            channel_capacity: default_channel_capacity(),
            log_level: default_log_level(),
            server_name: None,
            token,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.token.is_empty() {
            return Err(ConfigError::ValidationError("access token is empty".to_string()));
        }

        if self.languages.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one language is required".to_string(),
            ));
        }

        if self.concurrent_api_calls == 0 {
            return Err(ConfigError::ValidationError(
                "concurrent_api_calls must be greater than 0".to_string(),
            ));
        }

        if self.channel_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "channel_capacity must be greater than 0".to_string(),
            ));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "log_level must be one of: {}",
                valid_levels.join(", ")
            )));
        }

        Ok(())
    }

    /// Broker dial parameters for the configured environment
    pub fn connection_params(&self) -> ConnectionParams {
        let params = ConnectionParams::new(
            self.environment.broker_host(),
            self.token.clone(),
            self.bookmaker_id.to_string(),
        );
        match &self.server_name {
            Some(name) => params.with_server_name(name.clone()),
            None => params,
        }
    }

    /// Preload cutoff relative to `now`
    pub fn preload_to(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.preload_hours
            .map(|hours| now + ChronoDuration::hours(hours as i64))
    }

    /// Install the tracing subscriber at the configured level
    pub fn init_logging(&self) {
        init_tracing_with_level(&self.log_level);
    }

    /// Log configuration summary
    pub fn log(&self) {
        info!("Configuration loaded:");
        info!("  Environment: {}", self.environment);
        info!("  Bookmaker id: {}", self.bookmaker_id);
        info!("  Node id: {:?}", self.node_id);
        info!(
            "  Languages: {}",
            self.languages.iter().map(|l| l.as_str()).collect::<Vec<_>>().join(",")
        );
        info!("  Recovery seeds: {}", self.recovery.len());
        info!("  Preload hours: {:?}", self.preload_hours);
        info!("  Concurrent API calls: {}", self.concurrent_api_calls);
        info!("  Log level: {}", self.log_level);
    }
}
