//! Store configuration
//!
//! Loaded from a JSON file; every field has a default, so `{}` is a valid
//! configuration.
//!
//! Error codes:
//! - MEMDB_CONFIG_IO (ERROR)
//! - MEMDB_CONFIG_INVALID (ERROR)

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Configuration of one store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store name, included in log lines (default: "memdb")
    #[serde(default = "default_name")]
    pub name: String,

    /// Log every commit and abort at INFO (default: false)
    #[serde(default)]
    pub log_transactions: bool,

    /// Soft channel limit for watch sets built by the store (default: 2048)
    #[serde(default = "default_watch_limit")]
    pub watch_limit: usize,
}

fn default_name() -> String {
    "memdb".to_string()
}

fn default_watch_limit() -> usize {
    2048
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_transactions: false,
            watch_limit: default_watch_limit(),
        }
    }
}

impl StoreConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::io(format!("failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    /// Parse and validate configuration JSON
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: StoreConfig = serde_json::from_str(content)
            .map_err(|e| ConfigError::invalid(format!("invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::invalid("name must not be empty"));
        }
        if self.watch_limit == 0 {
            return Err(ConfigError::invalid("watch_limit must be > 0"));
        }
        Ok(())
    }
}

/// Configuration error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorCode {
    /// Config file could not be read
    MemdbConfigIo,
    /// Config is malformed or fails validation
    MemdbConfigInvalid,
}

impl ConfigErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigErrorCode::MemdbConfigIo => "MEMDB_CONFIG_IO",
            ConfigErrorCode::MemdbConfigInvalid => "MEMDB_CONFIG_INVALID",
        }
    }
}

/// Configuration error
#[derive(Debug, Clone)]
pub struct ConfigError {
    code: ConfigErrorCode,
    message: String,
}

impl ConfigError {
    pub fn io(message: impl Into<String>) -> Self {
        Self {
            code: ConfigErrorCode::MemdbConfigIo,
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            code: ConfigErrorCode::MemdbConfigInvalid,
            message: message.into(),
        }
    }

    pub fn code(&self) -> ConfigErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[ERROR] {}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Result type for configuration
pub type ConfigResult<T> = Result<T, ConfigError>;
