use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::{ConfigError, ConfigResult};

const LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level for all modules
    pub level: String,
    /// Per-module level overrides, e.g. `"node_access::access" = "debug"`
    pub modules: BTreeMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            modules: BTreeMap::new(),
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        check_level(&self.level)?;
        for (module, level) in &self.modules {
            check_level(level).map_err(|_| {
                ConfigError::Validation(format!("Invalid log level '{}' for module {}", level, module))
            })?;
        }
        Ok(())
    }
}

fn check_level(level: &str) -> ConfigResult<()> {
    if LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!("Invalid log level '{}'", level)))
    }
}
