//! Configuration for the access engine.
//!
//! Every field has a default, so an empty TOML document is a valid
//! configuration:
//!
//! ```toml
//! max_batch_size = 25
//! stale_cleanup = true
//! auto_heal = true
//!
//! [retry]
//! max_attempts = 5
//! initial_backoff_ms = 50
//! max_backoff_ms = 1000
//!
//! [logging]
//! level = "info"
//! ```

pub mod error;

pub use error::{ConfigError, ConfigResult};

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::logging::LoggingConfig;

/// Default chunk size for batched grant writes.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 25;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Upper bound on grants per batched write; the store's own limit also applies
    pub max_batch_size: usize,
    /// Revoke grants whose user or team no longer exists while describing a node
    pub stale_cleanup: bool,
    /// Restore a missing owner grant from the node directory while describing a node
    pub auto_heal: bool,
    pub retry: RetryPolicy,
    pub logging: LoggingConfig,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            stale_cleanup: true,
            auto_heal: true,
            retry: RetryPolicy::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AccessConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(contents: &str) -> ConfigResult<Self> {
        let config: AccessConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string(self)?)
    }

    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError::Validation` if:
    /// - The batch size is 0
    /// - The retry policy allows no attempts or has an inverted backoff range
    /// - A log level is not recognised
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_batch_size == 0 {
            return Err(ConfigError::Validation(
                "max_batch_size must be greater than 0".to_string(),
            ));
        }
        self.retry.validate()?;
        self.logging.validate()
    }
}

/// Backoff schedule for callers waiting on eventually-consistent reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff_ms: 50,
            max_backoff_ms: 1000,
        }
    }
}

impl RetryPolicy {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "retry.max_attempts must be greater than 0".to_string(),
            ));
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(ConfigError::Validation(format!(
                "retry.initial_backoff_ms ({}) exceeds retry.max_backoff_ms ({})",
                self.initial_backoff_ms, self.max_backoff_ms
            )));
        }
        Ok(())
    }

    /// Delay before the given retry (0-based), doubling up to the cap.
    #[must_use]
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u64.checked_shl(retry).unwrap_or(u64::MAX);
        let millis = self
            .initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(millis)
    }
}
