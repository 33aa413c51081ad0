//! Engine configuration
//!
//! Loaded from TOML or assembled in code. Every field has a default, so an
//! empty file is a valid configuration.
//!
//! ```toml
//! max_attempts = 5
//! backoff_initial_ms = 1
//! backoff_max_ms = 50
//! backoff_multiplier = 2
//! serialize_per_record = false
//! operation_timeout_ms = 2000
//! ```

use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Default bound on attempts per operation
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
/// Default first backoff delay
pub const DEFAULT_BACKOFF_INITIAL_MS: u64 = 1;
/// Default backoff ceiling
pub const DEFAULT_BACKOFF_MAX_MS: u64 = 50;
/// Default growth factor between delays
pub const DEFAULT_BACKOFF_MULTIPLIER: u32 = 2;

/// Configuration failures
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// TOML did not parse into an `EngineConfig`
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values parsed but are inconsistent
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tunables of the decrement engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Attempts per operation before surfacing a concurrency conflict
    pub max_attempts: u32,
    /// Delay before the second attempt; 0 retries immediately
    pub backoff_initial_ms: u64,
    /// Upper bound on any single delay
    pub backoff_max_ms: u64,
    /// Growth factor applied per retry
    pub backoff_multiplier: u32,
    /// Serialize operations on the same record in-process
    ///
    /// Reduces wasted retries under contention. Correctness never depends
    /// on it.
    pub serialize_per_record: bool,
    /// Deadline applied to every operation, on top of any caller token
    pub operation_timeout_ms: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_initial_ms: DEFAULT_BACKOFF_INITIAL_MS,
            backoff_max_ms: DEFAULT_BACKOFF_MAX_MS,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            serialize_per_record: false,
            operation_timeout_ms: None,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Reject settings the engine cannot honor
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.backoff_multiplier == 0 {
            return Err(ConfigError::Invalid(
                "backoff_multiplier must be at least 1".to_string(),
            ));
        }
        if self.backoff_initial_ms > self.backoff_max_ms {
            return Err(ConfigError::Invalid(format!(
                "backoff_initial_ms ({}) exceeds backoff_max_ms ({})",
                self.backoff_initial_ms, self.backoff_max_ms
            )));
        }
        Ok(())
    }

    /// Retry policy described by this configuration
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_backoff: Duration::from_millis(self.backoff_initial_ms),
            max_backoff: Duration::from_millis(self.backoff_max_ms),
            multiplier: self.backoff_multiplier,
        }
    }

    /// Per-operation deadline, if configured
    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout_ms.map(Duration::from_millis)
    }
}
