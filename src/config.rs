//! Configuration for the epictree application
//!
//! Settings come from environment variables (a `.env` file is honoured)
//! on top of built-in defaults. Unparsable values are logged and ignored.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use epictree_azdo::{AzdoConfig, AzdoError};
use epictree_core::assembler::{DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_CONCURRENT_FETCHES};
use epictree_core::{AssemblerConfig, BatchLimit};
use epictree_snapshot::file::DEFAULT_SNAPSHOT_PATH;
use tracing::warn;

use crate::error::{AppError, AppResult};

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Backend connection settings
    pub azdo: AzdoConfig,
    /// Maximum ids per work-item lookup
    pub batch_limit: BatchLimit,
    /// Lookups of one level allowed in flight at once
    pub max_concurrent_fetches: usize,
    /// Upper bound for a single lookup, in seconds
    pub fetch_timeout_secs: u64,
    /// Where the snapshot is written and read
    pub snapshot_path: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            azdo: AzdoConfig::default(),
            batch_limit: BatchLimit::default(),
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT.as_secs(),
            snapshot_path: PathBuf::from(DEFAULT_SNAPSHOT_PATH),
        }
    }
}

/// Parse an optional variable, warning about and skipping bad values
fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Invalid {} value: {}", name, raw);
            None
        }
    }
}

/// Non-blank string variable
fn string_var(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).filter(|value| !value.trim().is_empty())
}

impl AppConfig {
    /// Load configuration from the process environment
    pub fn load() -> AppResult<Self> {
        Self::load_from(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup
    pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        // Start with defaults
        let mut config = Self::default();

        if let Some(account) = string_var(&lookup, "AZDO_ACCOUNT") {
            config.azdo.account = account;
        }
        if let Some(project) = string_var(&lookup, "AZDO_PROJECT") {
            config.azdo.project = project;
        }
        if let Some(token) = string_var(&lookup, "AZDO_PERSONAL_ACCESS_TOKEN") {
            config.azdo.personal_access_token = token;
        }
        config.azdo.area_path = string_var(&lookup, "AZDO_AREA_PATH");
        config.azdo.work_items_query = string_var(&lookup, "AZDO_WORK_ITEMS_QUERY");
        if let Some(version) = string_var(&lookup, "AZDO_API_VERSION") {
            config.azdo.api_version = version;
        }
        if let Some(timeout) = parse_var(&lookup, "AZDO_TIMEOUT_SECS") {
            config.azdo.timeout_secs = timeout;
        }

        if let Some(limit) = parse_var::<usize>(&lookup, "BATCH_LIMIT") {
            config.batch_limit = BatchLimit::new(limit).map_err(|e| AppError::Config(e.to_string()))?;
        }
        if let Some(concurrency) = parse_var(&lookup, "MAX_CONCURRENT_FETCHES") {
            config.max_concurrent_fetches = concurrency;
        }
        if let Some(timeout) = parse_var(&lookup, "FETCH_TIMEOUT_SECS") {
            config.fetch_timeout_secs = timeout;
        }
        if let Some(path) = string_var(&lookup, "SNAPSHOT_PATH") {
            config.snapshot_path = PathBuf::from(path);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check settings needed by every run
    pub fn validate(&self) -> AppResult<()> {
        if self.max_concurrent_fetches == 0 {
            return Err(AppError::Config("MAX_CONCURRENT_FETCHES must be positive".to_string()));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(AppError::Config("FETCH_TIMEOUT_SECS must be positive".to_string()));
        }
        if self.batch_limit.get() > self.azdo.max_ids_per_request {
            return Err(AppError::Config(format!(
                "BATCH_LIMIT {} exceeds the backend limit of {} ids per request",
                self.batch_limit.get(),
                self.azdo.max_ids_per_request
            )));
        }
        Ok(())
    }

    /// Check settings needed to reach the backend
    pub fn validate_backend(&self) -> AppResult<()> {
        self.azdo.validate().map_err(|e| match e {
            AzdoError::MissingSettings(_) | AzdoError::InvalidSetting { .. } => AppError::Config(e.to_string()),
            other => AppError::Client(other),
        })
    }

    /// Assembler settings derived from this configuration
    pub fn assembler_config(&self) -> AssemblerConfig {
        AssemblerConfig {
            batch_limit: self.batch_limit,
            max_concurrent_fetches: self.max_concurrent_fetches,
            fetch_timeout: Some(Duration::from_secs(self.fetch_timeout_secs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::load_from(lookup(&[])).unwrap();

        assert_eq!(config.batch_limit.get(), 200);
        assert_eq!(config.max_concurrent_fetches, 4);
        assert_eq!(config.fetch_timeout_secs, 30);
        assert_eq!(config.snapshot_path, PathBuf::from("./WorkItems.json"));
        assert_eq!(config.azdo.api_version, "4.1-preview");
        assert_eq!(config.azdo.timeout_secs, 30);
        assert_eq!(config.azdo.max_ids_per_request, 200);
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::load_from(lookup(&[
            ("AZDO_ACCOUNT", "contoso"),
            ("AZDO_PROJECT", "Shop"),
            ("AZDO_PERSONAL_ACCESS_TOKEN", "pat"),
            ("AZDO_AREA_PATH", "Shop\\Web"),
            ("BATCH_LIMIT", "50"),
            ("MAX_CONCURRENT_FETCHES", "2"),
            ("FETCH_TIMEOUT_SECS", "5"),
            ("SNAPSHOT_PATH", "/tmp/items.json"),
        ]))
        .unwrap();

        assert_eq!(config.azdo.account, "contoso");
        assert_eq!(config.azdo.area_path.as_deref(), Some("Shop\\Web"));
        assert_eq!(config.batch_limit.get(), 50);
        assert_eq!(config.snapshot_path, PathBuf::from("/tmp/items.json"));
        assert!(config.validate_backend().is_ok());

        let assembler = config.assembler_config();
        assert_eq!(assembler.max_concurrent_fetches, 2);
        assert_eq!(assembler.fetch_timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_unparsable_values_keep_defaults() {
        let config = AppConfig::load_from(lookup(&[
            ("BATCH_LIMIT", "lots"),
            ("AZDO_TIMEOUT_SECS", "-3"),
        ]))
        .unwrap();

        assert_eq!(config.batch_limit.get(), 200);
        assert_eq!(config.azdo.timeout_secs, 30);
    }

    #[test]
    fn test_zero_batch_limit_rejected() {
        let result = AppConfig::load_from(lookup(&[("BATCH_LIMIT", "0")]));
        assert!(matches!(result, Err(AppError::Config(_))));

        let result = AppConfig::load_from(lookup(&[("MAX_CONCURRENT_FETCHES", "0")]));
        assert!(matches!(result, Err(AppError::Config(_))));

        let result = AppConfig::load_from(lookup(&[("BATCH_LIMIT", "500")]));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_missing_credentials_reported_together() {
        let config = AppConfig::load_from(lookup(&[("AZDO_PROJECT", "Shop")])).unwrap();

        match config.validate_backend() {
            Err(AppError::Config(message)) => {
                assert!(message.contains("AZDO_ACCOUNT"));
                assert!(message.contains("AZDO_PERSONAL_ACCESS_TOKEN"));
                assert!(!message.contains("AZDO_PROJECT"));
            }
            other => panic!("Expected config error, got {:?}", other),
        }
    }
}
