//! # Stockbook Configuration
//!
//! Where the database lives and how the ledger treats negative stock.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     STOCKBOOK_DB_PATH=/var/lib/stockbook/stock.db                      │
//! │     STOCKBOOK_STOCK_POLICY=allow_negative                              │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/stockbook/stockbook.toml (Linux)                         │
//! │     ~/Library/Application Support/com.stockbook.stockbook/... (macOS)  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     ./stockbook.db, 5 connections, enforce                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "/var/lib/stockbook/stock.db"
//! max_connections = 8
//! busy_timeout_secs = 10
//!
//! [ledger]
//! stock_policy = "enforce"  # enforce | allow_negative
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use stockbook_core::StockPolicy;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::pool::DbConfig;

pub const ENV_DB_PATH: &str = "STOCKBOOK_DB_PATH";
pub const ENV_MAX_CONNECTIONS: &str = "STOCKBOOK_MAX_CONNECTIONS";
pub const ENV_BUSY_TIMEOUT_SECS: &str = "STOCKBOOK_BUSY_TIMEOUT_SECS";
pub const ENV_STOCK_POLICY: &str = "STOCKBOOK_STOCK_POLICY";

// =============================================================================
// Sections
// =============================================================================

/// `[database]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Created on first connect.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a writer waits on a locked database file.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_secs: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("stockbook.db")
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout() -> u64 {
    10
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
            busy_timeout_secs: default_busy_timeout(),
        }
    }
}

/// `[ledger]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerSettings {
    #[serde(default)]
    pub stock_policy: StockPolicy,
}

// =============================================================================
// Root Config
// =============================================================================

/// Complete configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StockbookConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub ledger: LedgerSettings,
}

impl StockbookConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (stockbook.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> DbResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading stockbook config from file");
                let contents = std::fs::read_to_string(&path)
                    .map_err(|e| DbError::Config(format!("{}: {}", path.display(), e)))?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML document.
    pub fn from_toml(contents: &str) -> DbResult<Self> {
        toml::from_str(contents).map_err(|e| DbError::Config(e.to_string()))
    }

    /// Applies `STOCKBOOK_*` overrides read through `lookup`.
    ///
    /// Unparseable values are logged and ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_DB_PATH) {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = lookup(ENV_MAX_CONNECTIONS) {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring invalid {}", ENV_MAX_CONNECTIONS),
            }
        }

        if let Some(secs) = lookup(ENV_BUSY_TIMEOUT_SECS) {
            match secs.parse::<u64>() {
                Ok(n) => self.database.busy_timeout_secs = n,
                Err(_) => warn!(value = %secs, "Ignoring invalid {}", ENV_BUSY_TIMEOUT_SECS),
            }
        }

        if let Some(policy) = lookup(ENV_STOCK_POLICY) {
            match policy.parse::<StockPolicy>() {
                Ok(parsed) => {
                    debug!(policy = %parsed, "Overriding stock policy from environment");
                    self.ledger.stock_policy = parsed;
                }
                Err(e) => warn!(value = %policy, error = %e, "Ignoring invalid stock policy"),
            }
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> DbResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(DbError::Config("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(DbError::Config(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Builds the pool configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::from(self)
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "stockbook", "stockbook")
            .map(|dirs| dirs.config_dir().join("stockbook.toml"))
    }
}

impl From<&StockbookConfig> for DbConfig {
    fn from(config: &StockbookConfig) -> Self {
        DbConfig::new(&config.database.path)
            .max_connections(config.database.max_connections)
            .busy_timeout(Duration::from_secs(config.database.busy_timeout_secs))
            .stock_policy(config.ledger.stock_policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = StockbookConfig::default();
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.ledger.stock_policy, StockPolicy::Enforce);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = StockbookConfig::from_toml(
            r#"
            [ledger]
            stock_policy = "allow_negative"
            "#,
        )
        .unwrap();

        assert_eq!(config.ledger.stock_policy, StockPolicy::AllowNegative);
        assert_eq!(config.database.busy_timeout_secs, 10);
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = StockbookConfig::from_toml("[ledger]\nstock_policy = 3").unwrap_err();
        assert!(matches!(err, DbError::Config(_)));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_DB_PATH, "/tmp/other.db"),
            (ENV_MAX_CONNECTIONS, "not-a-number"),
            (ENV_STOCK_POLICY, "allow-negative"),
        ]
        .into_iter()
        .collect();

        let mut config = StockbookConfig::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.database.path, PathBuf::from("/tmp/other.db"));
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.ledger.stock_policy, StockPolicy::AllowNegative);
    }

    #[test]
    fn test_validation_rejects_zero_connections() {
        let mut config = StockbookConfig::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_into_db_config() {
        let mut config = StockbookConfig::default();
        config.ledger.stock_policy = StockPolicy::AllowNegative;
        let db_config = DbConfig::from(&config);
        assert_eq!(db_config.stock_policy, StockPolicy::AllowNegative);
        assert_eq!(db_config.busy_timeout, Duration::from_secs(10));
    }
}
