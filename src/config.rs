//! Configuration for the zone resolver.
//!
//! All values have defaults, so an empty document deserializes into a usable
//! configuration backed by an in-memory catalogue.

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

use crate::rr::TimeToLive;

const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 30;
const DEFAULT_LOOKUP_TIMEOUT_MILLIS: u64 = 2000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("zone refresh interval must be at least one second")]
    ZeroRefreshInterval,

    #[error("domain lookup timeout must be greater than zero")]
    ZeroLookupTimeout,
}

/// Configuration for the SQLite backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SqliteConfiguration {
    #[serde(default)]
    path: Option<Utf8PathBuf>,
}

impl SqliteConfiguration {
    /// Use the database file at `path`.
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Use a private in-memory database.
    pub fn in_memory() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Utf8Path> {
        self.path.as_deref()
    }
}

/// Settings consumed when building a [`crate::ZoneDns`] service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ZoneDnsConfig {
    /// Seconds between zone refreshes.
    #[serde(default = "default_refresh_interval")]
    refresh_interval: u64,

    /// TTL applied to every answer record.
    #[serde(default)]
    ttl: TimeToLive,

    /// Upper bound on a single domain lookup, in milliseconds.
    #[serde(default = "default_lookup_timeout")]
    lookup_timeout: u64,

    #[serde(default)]
    database: SqliteConfiguration,
}

fn default_refresh_interval() -> u64 {
    DEFAULT_REFRESH_INTERVAL_SECS
}

fn default_lookup_timeout() -> u64 {
    DEFAULT_LOOKUP_TIMEOUT_MILLIS
}

impl Default for ZoneDnsConfig {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL_SECS,
            ttl: TimeToLive::default(),
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT_MILLIS,
            database: SqliteConfiguration::default(),
        }
    }
}

impl ZoneDnsConfig {
    pub fn with_refresh_interval(mut self, secs: u64) -> Self {
        self.refresh_interval = secs;
        self
    }

    pub fn with_ttl(mut self, ttl: impl Into<TimeToLive>) -> Self {
        self.ttl = ttl.into();
        self
    }

    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout.as_millis().try_into().unwrap_or(u64::MAX);
        self
    }

    pub fn with_database(mut self, database: SqliteConfiguration) -> Self {
        self.database = database;
        self
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval)
    }

    pub fn ttl(&self) -> TimeToLive {
        self.ttl
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout)
    }

    pub fn database(&self) -> &SqliteConfiguration {
        &self.database
    }

    /// Check the constraints serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.refresh_interval == 0 {
            return Err(ConfigError::ZeroRefreshInterval);
        }
        if self.lookup_timeout == 0 {
            return Err(ConfigError::ZeroLookupTimeout);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ZoneDnsConfig::default();
        assert_eq!(config.refresh_interval(), Duration::from_secs(30));
        assert_eq!(config.ttl(), TimeToLive::from_secs(600));
        assert_eq!(config.lookup_timeout(), Duration::from_secs(2));
        assert_eq!(config.database().path(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: ZoneDnsConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ZoneDnsConfig::default());
    }

    #[test]
    fn test_deserialize_values() {
        let config: ZoneDnsConfig = serde_json::from_str(
            r#"{"refresh_interval": 5, "ttl": 123, "lookup_timeout": 250, "database": {"path": "/var/lib/zonedns.db"}}"#,
        )
        .unwrap();
        assert_eq!(config.refresh_interval(), Duration::from_secs(5));
        assert_eq!(config.ttl(), TimeToLive::from_secs(123));
        assert_eq!(config.lookup_timeout(), Duration::from_millis(250));
        assert_eq!(
            config.database().path(),
            Some(Utf8Path::new("/var/lib/zonedns.db"))
        );
    }

    #[test]
    fn test_zero_refresh_interval_rejected() {
        let config = ZoneDnsConfig::default().with_refresh_interval(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroRefreshInterval));
    }

    #[test]
    fn test_zero_lookup_timeout_rejected() {
        let config = ZoneDnsConfig::default().with_lookup_timeout(Duration::ZERO);
        assert_eq!(config.validate(), Err(ConfigError::ZeroLookupTimeout));
    }

    #[test]
    fn test_zero_ttl_allowed() {
        let config = ZoneDnsConfig::default().with_ttl(0);
        assert!(config.validate().is_ok());
        assert_eq!(config.ttl(), TimeToLive::ZERO);
    }
}
