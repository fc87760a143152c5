//! Configuration file parsing for the service
//!
//! Loads settings from TOML: bind address, database path, the policy
//! document location, the validator pool, auditor grants, and the
//! background worker schedules.

use cairn_detector::DetectorConfig;
use cairn_hygiene::HygieneConfig;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Service configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// A configured value is invalid
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Service configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Bind address (e.g., "127.0.0.1")
    pub bind_address: String,

    /// Bind port (e.g., 8080)
    pub bind_port: u16,

    /// SQLite database path; `:memory:` for ephemeral runs
    pub db_path: String,

    /// Optional path to the gate policy TOML; defaults apply if absent
    #[serde(default)]
    pub policy_path: Option<String>,

    /// Agents eligible for cross-validation assignments
    #[serde(default)]
    pub validator_pool: Vec<String>,

    /// Agents granted the auditor capability
    #[serde(default)]
    pub auditors: Vec<String>,

    /// How often to expire overdue validation rounds (seconds)
    #[serde(default = "default_round_expiry_interval")]
    pub round_expiry_interval_secs: u64,

    /// Hygiene worker settings
    #[serde(default)]
    pub hygiene: HygieneConfig,

    /// Detector worker settings
    #[serde(default)]
    pub detector: DetectorConfig,
}

fn default_round_expiry_interval() -> u64 {
    60
}

impl ServiceConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: ServiceConfig = toml::from_str(&contents)?;
        if config.db_path.is_empty() {
            return Err(ConfigError::InvalidValue("db_path must not be empty".into()));
        }
        Ok(config)
    }

    /// Create a default configuration for testing
    pub fn default_test_config() -> Self {
        ServiceConfig {
            bind_address: "127.0.0.1".to_string(),
            bind_port: 8080,
            db_path: ":memory:".to_string(),
            policy_path: None,
            validator_pool: vec!["checker-1".to_string(), "checker-2".to_string()],
            auditors: vec!["overseer-1".to_string()],
            round_expiry_interval_secs: 60,
            hygiene: HygieneConfig::default(),
            detector: DetectorConfig::default(),
        }
    }

    /// Get the full bind address (address:port)
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.bind_port)
    }
}
