//! Configuration management for the circulation core

use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// Path of the JSON snapshot file
    pub data_file: PathBuf,
    /// Snapshot writes tried per change, including the first
    pub save_attempts: u32,
    /// Delay before the first retry; doubles on each further retry
    pub retry_delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
}

/// Circulation rules. Every limit the services enforce comes from here.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct PolicyConfig {
    /// Maximum simultaneously open transactions per member
    pub max_borrowed_books: usize,
    pub loan_period_days: i64,
    /// Charged per whole day past the due date
    pub fine_per_day: Decimal,
    /// Validity granted by one fee payment
    pub membership_period_days: i64,
    /// Annual fee assigned at registration
    pub default_annual_fee: Decimal,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // LIBRARY_POLICY__LOAN_PERIOD_DAYS=21 and so on
            .add_source(
                Environment::with_prefix("LIBRARY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("storage.data_file", env::var("LIBRARY_DATA_FILE").ok())?
            .build()?;

        config.try_deserialize()
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("library_data.json"),
            save_attempts: 3,
            retry_delay_ms: 50,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            max_borrowed_books: 3,
            loan_period_days: 14,
            fine_per_day: Decimal::new(100, 2),
            membership_period_days: 365,
            default_annual_fee: Decimal::new(5000, 2),
        }
    }
}
