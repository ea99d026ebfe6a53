//! Structured logging using tracing.
//!
//! Pretty output for interactive use, JSON for log aggregation. `RUST_LOG`
//! takes precedence over the configured filter.

use std::env;
use std::str::FromStr;

use anyhow::Context;
use clap::ValueEnum;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default filter directives
pub const DEFAULT_LOG_FILTER: &str = "info,epictree=debug";

/// Output format of log lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("Unknown log format: {}", other)),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `EnvFilter` directives
    pub log_filter: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            format: LogFormat::default(),
        }
    }
}

impl LoggingConfig {
    /// Read `LOG_FILTER` and `LOG_FORMAT` from the environment
    pub fn load() -> Self {
        Self::load_from(|name| env::var(name).ok())
    }

    /// Read logging settings from an arbitrary variable lookup.
    ///
    /// Runs before logging exists, so bad values are reported on stderr.
    pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(filter) = lookup("LOG_FILTER").filter(|f| !f.trim().is_empty()) {
            config.log_filter = filter;
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            match format.parse() {
                Ok(format) => config.format = format,
                Err(e) => eprintln!("Invalid LOG_FORMAT value: {}", e),
            }
        }
        config
    }
}

/// Initialize the global subscriber. Logs go to stderr.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_filter)
            .with_context(|| format!("Invalid log filter: {}", config.log_filter))?,
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    match config.format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    }
    .context("Failed to set global default subscriber")?;

    debug!(log_filter = %config.log_filter, log_format = ?config.format, "Logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!(" pretty ".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_load_from_lookup() {
        let config = LoggingConfig::load_from(|name| match name {
            "LOG_FILTER" => Some("warn".to_string()),
            "LOG_FORMAT" => Some("json".to_string()),
            _ => None,
        });
        assert_eq!(config.log_filter, "warn");
        assert_eq!(config.format, LogFormat::Json);

        let config = LoggingConfig::load_from(|name| match name {
            "LOG_FORMAT" => Some("yaml".to_string()),
            _ => None,
        });
        assert_eq!(config, LoggingConfig::default());
    }
}
