//! Logging setup on top of the `log` facade.
//!
//! The engine itself only emits `log` records. Embedders either install
//! their own logger or call [`init_logging`] once at startup.

pub mod config;

pub use config::LoggingConfig;

use log::LevelFilter;
use std::str::FromStr;

/// Installs `env_logger` with the configured levels.
///
/// `RUST_LOG`, when set, takes precedence over the configuration. Calling
/// this more than once is harmless; only the first call installs a logger.
pub fn init_logging(config: &LoggingConfig) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(parse_level(&config.level));
    for (module, level) in &config.modules {
        builder.filter_module(module, parse_level(level));
    }
    if let Ok(spec) = std::env::var("RUST_LOG") {
        builder.parse_filters(&spec);
    }
    if builder.try_init().is_err() {
        log::debug!("Logger already initialized, keeping existing configuration");
    }
}

fn parse_level(level: &str) -> LevelFilter {
    LevelFilter::from_str(level).unwrap_or(LevelFilter::Info)
}
