//! Configuration management.
//!
//! TOML-backed, type-safe configuration with serde defaults for every field
//! and validation on load. The file is organized into logical sections:
//!
//! - `[economy]` - starting balance, earning cap, history depth
//! - `[quests]` - sweep and reset-check cadences, optional seed file paths
//! - `[storage]` - data directory and flush interval
//! - `[logging]` - log level
//!
//! ```toml
//! [economy]
//! starting_balance = 100
//! max_coins_per_hour = 1000
//!
//! [storage]
//! data_dir = "./data"
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

/// Economy tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EconomyConfig {
    /// Coins a brand-new wallet starts with.
    #[serde(default = "default_starting_balance")]
    pub starting_balance: u64,
    /// Hourly earning cap enforced on the normal earn path.
    #[serde(default = "default_max_coins_per_hour")]
    pub max_coins_per_hour: u64,
    /// Retained ledger entries per player.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Seconds between auto-sell drain passes.
    #[serde(default = "default_autosell_interval")]
    pub autosell_interval_secs: u64,
    /// Seconds between derived stats rebuilds.
    #[serde(default = "default_stats_refresh")]
    pub stats_refresh_secs: u64,
    /// Optional JSON price sheet; the built-in crop prices apply when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_file: Option<String>,
}

fn default_starting_balance() -> u64 {
    100
}

fn default_max_coins_per_hour() -> u64 {
    1000
}

fn default_history_limit() -> usize {
    100
}

fn default_autosell_interval() -> u64 {
    30
}

fn default_stats_refresh() -> u64 {
    300
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            starting_balance: default_starting_balance(),
            max_coins_per_hour: default_max_coins_per_hour(),
            history_limit: default_history_limit(),
            autosell_interval_secs: default_autosell_interval(),
            stats_refresh_secs: default_stats_refresh(),
            price_file: None,
        }
    }
}

/// Quest system tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestsConfig {
    /// Seconds between expiry sweeps.
    #[serde(default = "default_expiry_sweep")]
    pub expiry_sweep_secs: u64,
    /// Seconds between daily/weekly boundary checks.
    #[serde(default = "default_reset_check")]
    pub reset_check_secs: u64,
    /// Optional JSON template file; the built-in quest board applies when
    /// unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_file: Option<String>,
}

fn default_expiry_sweep() -> u64 {
    60
}

fn default_reset_check() -> u64 {
    60
}

impl Default for QuestsConfig {
    fn default() -> Self {
        Self {
            expiry_sweep_secs: default_expiry_sweep(),
            reset_check_secs: default_reset_check(),
            template_file: None,
        }
    }
}

/// Persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Seconds between periodic full flushes.
    #[serde(default = "default_save_interval")]
    pub save_interval_secs: u64,
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_save_interval() -> u64 {
    300
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            save_interval_secs: default_save_interval(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub economy: EconomyConfig,
    #[serde(default)]
    pub quests: QuestsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a file.
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;
        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration file.
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;
        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.economy.max_coins_per_hour == 0 {
            return Err(anyhow!("economy.max_coins_per_hour must be greater than 0"));
        }
        if self.economy.history_limit == 0 {
            return Err(anyhow!("economy.history_limit must be greater than 0"));
        }
        if self.storage.data_dir.trim().is_empty() {
            return Err(anyhow!("storage.data_dir must not be empty"));
        }
        match self.logging.level.as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => Ok(()),
            other => Err(anyhow!("logging.level '{}' is not a valid log level", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        Config::default().validate().expect("defaults are valid");
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config: Config = toml::from_str(
            r#"
            [economy]
            starting_balance = 250

            [logging]
            level = "debug"
            "#,
        )
        .expect("parse");
        assert_eq!(config.economy.starting_balance, 250);
        assert_eq!(config.economy.max_coins_per_hour, 1000);
        assert_eq!(config.quests.expiry_sweep_secs, 60);
        assert_eq!(config.storage.data_dir, "./data");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn zero_earning_cap_is_rejected() {
        let config: Config = toml::from_str(
            r#"
            [economy]
            max_coins_per_hour = 0
            "#,
        )
        .expect("parse");
        assert!(config.validate().is_err());
    }

    #[test]
    fn bogus_log_level_is_rejected() {
        let config: Config = toml::from_str(
            r#"
            [logging]
            level = "chatty"
            "#,
        )
        .expect("parse");
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_round_trips_through_toml() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).expect("serialize");
        let parsed: Config = toml::from_str(&serialized).expect("reparse");
        assert_eq!(parsed.economy.starting_balance, config.economy.starting_balance);
        assert_eq!(parsed.storage.save_interval_secs, config.storage.save_interval_secs);
    }
}
