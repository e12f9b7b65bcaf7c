//! # Ledger Configuration
//!
//! Where the ledger database lives and how hard transactions retry.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     GLOW_DB_PATH=/srv/glow/glow.db                                     │
//! │     GLOW_DB_MAX_CONNECTIONS=8                                          │
//! │     GLOW_TX_MAX_ATTEMPTS=10                                            │
//! │     GLOW_TX_INITIAL_BACKOFF_MS=25                                      │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/glow/glow.toml (Linux)                                   │
//! │     ~/Library/Application Support/com.glow.glow/glow.toml (macOS)      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "/srv/glow/glow.db"
//! max_connections = 5
//!
//! [transactions]
//! max_attempts = 5
//! initial_backoff_ms = 20
//! max_backoff_ms = 1000
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::pool::DbConfig;
use crate::retry::RetryPolicy;

const CONFIG_FILE_NAME: &str = "glow.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Defaults to `glow.db` in the platform data directory.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> PathBuf {
    directories::ProjectDirs::from("com", "glow", "glow")
        .map(|dirs| dirs.data_dir().join("glow.db"))
        .unwrap_or_else(|| PathBuf::from("glow.db"))
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionSettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    5
}
fn default_initial_backoff() -> u64 {
    20
}
fn default_max_backoff() -> u64 {
    1000
}

impl Default for TransactionSettings {
    fn default() -> Self {
        TransactionSettings {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

/// Top-level configuration of the ledger store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub transactions: TransactionSettings,
}

impl LedgerConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`glow.toml`)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> DbResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading ledger config from file");
                let contents = std::fs::read_to_string(&path).map_err(|e| {
                    DbError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
                })?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    pub fn from_toml(contents: &str) -> DbResult<Self> {
        toml::from_str(contents).map_err(|e| DbError::InvalidConfig(e.to_string()))
    }

    pub fn validate(&self) -> DbResult<()> {
        if self.database.max_connections == 0 {
            return Err(DbError::InvalidConfig(
                "database.max_connections must be greater than 0".into(),
            ));
        }
        if self.transactions.max_attempts == 0 {
            return Err(DbError::InvalidConfig(
                "transactions.max_attempts must be greater than 0".into(),
            ));
        }
        if self.transactions.initial_backoff_ms > self.transactions.max_backoff_ms {
            return Err(DbError::InvalidConfig(
                "transactions.initial_backoff_ms must not exceed max_backoff_ms".into(),
            ));
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("GLOW_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(value) = lookup("GLOW_DB_MAX_CONNECTIONS") {
            match value.parse() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %value, "Ignoring invalid GLOW_DB_MAX_CONNECTIONS"),
            }
        }

        if let Some(value) = lookup("GLOW_TX_MAX_ATTEMPTS") {
            match value.parse() {
                Ok(n) => self.transactions.max_attempts = n,
                Err(_) => warn!(value = %value, "Ignoring invalid GLOW_TX_MAX_ATTEMPTS"),
            }
        }

        if let Some(value) = lookup("GLOW_TX_INITIAL_BACKOFF_MS") {
            match value.parse() {
                Ok(n) => self.transactions.initial_backoff_ms = n,
                Err(_) => warn!(value = %value, "Ignoring invalid GLOW_TX_INITIAL_BACKOFF_MS"),
            }
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "glow", "glow")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path).max_connections(self.database.max_connections)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.transactions.max_attempts,
            initial_backoff: Duration::from_millis(self.transactions.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.transactions.max_backoff_ms),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config_is_valid() {
        let config = LedgerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.transactions.max_attempts, 5);
        assert!(config.database.path.ends_with("glow.db"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = LedgerConfig::from_toml(
            r#"
            [transactions]
            max_attempts = 12
            "#,
        )
        .unwrap();

        assert_eq!(config.transactions.max_attempts, 12);
        assert_eq!(config.transactions.initial_backoff_ms, 20);
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_invalid_toml() {
        let err = LedgerConfig::from_toml("[database]\nmax_connections = \"lots\"").unwrap_err();
        assert!(matches!(err, DbError::InvalidConfig(_)));
    }

    #[test]
    fn test_validation() {
        let mut config = LedgerConfig::default();
        config.transactions.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = LedgerConfig::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());

        let mut config = LedgerConfig::default();
        config.transactions.initial_backoff_ms = 5000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("GLOW_DB_PATH", "/tmp/ledger.db"),
            ("GLOW_TX_MAX_ATTEMPTS", "9"),
            ("GLOW_DB_MAX_CONNECTIONS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = LedgerConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.database.path, PathBuf::from("/tmp/ledger.db"));
        assert_eq!(config.transactions.max_attempts, 9);
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_conversions() {
        let mut config = LedgerConfig::default();
        config.database.path = PathBuf::from("/tmp/ledger.db");
        config.database.max_connections = 3;
        config.transactions.initial_backoff_ms = 7;

        let db = config.db_config();
        assert_eq!(db.database_path, PathBuf::from("/tmp/ledger.db"));
        assert_eq!(db.max_connections, 3);

        let retry = config.retry_policy();
        assert_eq!(retry.max_attempts, 5);
        assert_eq!(retry.initial_backoff, Duration::from_millis(7));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = LedgerConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        assert_eq!(LedgerConfig::from_toml(&text).unwrap(), config);
    }
}
