//! # Engine Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TALLY_DB_PATH=/var/lib/tally/tally.db                              │
//! │     TALLY_DISCOUNT_THRESHOLD_CENTS=30000000                            │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/tally-backoffice/engine.toml (Linux)                     │
//! │     ~/Library/Application Support/com.tally.backoffice/engine.toml     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "/var/lib/tally/tally.db"
//! max_connections = 5
//! busy_timeout_ms = 5000
//!
//! [pricing]
//! discount_threshold_cents = 30000000
//! max_line_quantity = 10000
//!
//! [invoicing]
//! due_days = 30
//! invoice_prefix = "INV"
//! receipt_prefix = "RCT"
//!
//! [logging]
//! filter = "info,tally=debug,sqlx=warn"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use tally_core::pricing::PricingConfig;
use tally_core::{Money, DEFAULT_DISCOUNT_THRESHOLD_CENTS, DEFAULT_DUE_DAYS, MAX_LINE_QUANTITY, MAX_ORDER_LINES};
use tally_db::DbConfig;

const CONFIG_FILE: &str = "engine.toml";
const DATABASE_FILE: &str = "tally.db";

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to write config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Database file. Defaults to the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,

    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

fn default_max_connections() -> u32 {
    5
}
fn default_min_connections() -> u32 {
    1
}
fn default_acquire_timeout() -> u64 {
    30
}
fn default_busy_timeout() -> u64 {
    5_000
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            acquire_timeout_secs: default_acquire_timeout(),
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingSettings {
    /// Order subtotal (list prices) at which category discounts apply.
    #[serde(default = "default_threshold")]
    pub discount_threshold_cents: i64,

    #[serde(default = "default_max_line_quantity")]
    pub max_line_quantity: i64,

    #[serde(default = "default_max_order_lines")]
    pub max_order_lines: usize,
}

fn default_threshold() -> i64 {
    DEFAULT_DISCOUNT_THRESHOLD_CENTS
}
fn default_max_line_quantity() -> i64 {
    MAX_LINE_QUANTITY
}
fn default_max_order_lines() -> usize {
    MAX_ORDER_LINES
}

impl Default for PricingSettings {
    fn default() -> Self {
        PricingSettings {
            discount_threshold_cents: default_threshold(),
            max_line_quantity: default_max_line_quantity(),
            max_order_lines: default_max_order_lines(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoicingSettings {
    #[serde(default = "default_due_days")]
    pub due_days: i64,

    #[serde(default = "default_invoice_prefix")]
    pub invoice_prefix: String,

    #[serde(default = "default_receipt_prefix")]
    pub receipt_prefix: String,
}

fn default_due_days() -> i64 {
    DEFAULT_DUE_DAYS
}
fn default_invoice_prefix() -> String {
    "INV".to_string()
}
fn default_receipt_prefix() -> String {
    "RCT".to_string()
}

impl Default for InvoicingSettings {
    fn default() -> Self {
        InvoicingSettings {
            due_days: default_due_days(),
            invoice_prefix: default_invoice_prefix(),
            receipt_prefix: default_receipt_prefix(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_filter() -> String {
    "info,tally=debug,sqlx=warn".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            filter: default_filter(),
        }
    }
}

// =============================================================================
// Engine Configuration
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub pricing: PricingSettings,

    #[serde(default)]
    pub invoicing: InvoicingSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl EngineConfig {
    /// Loads defaults, then the config file, then `TALLY_*` environment
    /// overrides, and validates the result.
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading engine config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConfigError::Invalid("no config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&path, toml::to_string_pretty(self)?)?;
        info!(?path, "Engine config saved");
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid("database.max_connections must be greater than 0".into()));
        }
        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid(
                "database.min_connections cannot exceed max_connections".into(),
            ));
        }
        if self.pricing.discount_threshold_cents < 0 {
            return Err(ConfigError::Invalid("pricing.discount_threshold_cents cannot be negative".into()));
        }
        if self.pricing.max_line_quantity < 1 || self.pricing.max_order_lines == 0 {
            return Err(ConfigError::Invalid("pricing limits must be positive".into()));
        }
        if self.invoicing.due_days < 0 {
            return Err(ConfigError::Invalid("invoicing.due_days cannot be negative".into()));
        }
        if self.invoicing.invoice_prefix.trim().is_empty() || self.invoicing.receipt_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid("invoice number prefixes cannot be empty".into()));
        }
        if self.invoicing.invoice_prefix == self.invoicing.receipt_prefix {
            return Err(ConfigError::Invalid("invoice and receipt prefixes must differ".into()));
        }
        Ok(())
    }

    /// Applies `TALLY_*` overrides read through `lookup`.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("TALLY_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(value) = lookup("TALLY_DB_MAX_CONNECTIONS") {
            match value.parse() {
                Ok(max) => self.database.max_connections = max,
                Err(_) => warn!(value = %value, "Ignoring invalid TALLY_DB_MAX_CONNECTIONS"),
            }
        }

        if let Some(value) = lookup("TALLY_DISCOUNT_THRESHOLD_CENTS") {
            match value.parse() {
                Ok(cents) => {
                    debug!(cents, "Overriding discount threshold from environment");
                    self.pricing.discount_threshold_cents = cents;
                }
                Err(_) => warn!(value = %value, "Ignoring invalid TALLY_DISCOUNT_THRESHOLD_CENTS"),
            }
        }

        if let Some(value) = lookup("TALLY_DUE_DAYS") {
            match value.parse() {
                Ok(days) => self.invoicing.due_days = days,
                Err(_) => warn!(value = %value, "Ignoring invalid TALLY_DUE_DAYS"),
            }
        }

        if let Some(prefix) = lookup("TALLY_INVOICE_PREFIX") {
            self.invoicing.invoice_prefix = prefix;
        }

        if let Some(filter) = lookup("TALLY_LOG") {
            self.logging.filter = filter;
        }
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("com", "tally", "backoffice")
    }

    fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    /// Configured database path, or `tally.db` in the platform data
    /// directory.
    pub fn database_path(&self) -> ConfigResult<PathBuf> {
        if let Some(path) = &self.database.path {
            return Ok(path.clone());
        }

        let dirs = Self::project_dirs()
            .ok_or_else(|| ConfigError::Invalid("could not determine data directory".into()))?;
        std::fs::create_dir_all(dirs.data_dir())?;
        Ok(dirs.data_dir().join(DATABASE_FILE))
    }

    pub fn db_config(&self) -> ConfigResult<DbConfig> {
        Ok(DbConfig::new(self.database_path()?)
            .max_connections(self.database.max_connections)
            .min_connections(self.database.min_connections)
            .connect_timeout(Duration::from_secs(self.database.acquire_timeout_secs))
            .busy_timeout(Duration::from_millis(self.database.busy_timeout_ms)))
    }

    pub fn pricing_config(&self) -> PricingConfig {
        PricingConfig {
            discount_threshold: Money::from_cents(self.pricing.discount_threshold_cents),
            max_line_quantity: self.pricing.max_line_quantity,
            max_order_lines: self.pricing.max_order_lines,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pricing_config().discount_threshold, Money::from_major(300_000));
        assert_eq!(config.invoicing.invoice_prefix, "INV");
        assert_eq!(config.logging.filter, "info,tally=debug,sqlx=warn");
    }

    #[test]
    fn test_partial_toml() {
        let config: EngineConfig = toml::from_str(
            r#"
            [pricing]
            discount_threshold_cents = 100000

            [invoicing]
            due_days = 14
            "#,
        )
        .unwrap();

        assert_eq!(config.pricing.discount_threshold_cents, 100_000);
        assert_eq!(config.pricing.max_line_quantity, MAX_LINE_QUANTITY);
        assert_eq!(config.invoicing.due_days, 14);
        assert_eq!(config.invoicing.receipt_prefix, "RCT");
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("TALLY_DB_PATH", "/tmp/override.db"),
            ("TALLY_DISCOUNT_THRESHOLD_CENTS", "5000"),
            ("TALLY_DUE_DAYS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = EngineConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.database.path, Some(PathBuf::from("/tmp/override.db")));
        assert_eq!(config.pricing.discount_threshold_cents, 5000);
        assert_eq!(config.invoicing.due_days, DEFAULT_DUE_DAYS);
        assert_eq!(config.database_path().unwrap(), PathBuf::from("/tmp/override.db"));
    }

    #[test]
    fn test_validation() {
        let mut config = EngineConfig::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.invoicing.receipt_prefix = "INV".into();
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.pricing.discount_threshold_cents = -1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");

        let mut config = EngineConfig::default();
        config.invoicing.due_days = 7;
        config.save(Some(path.clone())).unwrap();

        let loaded = EngineConfig::load(Some(path)).unwrap();
        assert_eq!(loaded.invoicing.due_days, 7);
    }
}
