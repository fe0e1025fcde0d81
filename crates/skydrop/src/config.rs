//! Configuration management for skydrop.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use skydrop_maps::MapSettings;

use crate::error::{Error, Result};
use crate::session::Role;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "skydrop";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "orders.db";

/// Prefix of configuration environment variables.
const ENV_PREFIX: &str = "SKYDROP_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `SKYDROP_`, nested keys joined
///    with `__`, e.g. `SKYDROP_MAPS__API_KEY`)
/// 2. TOML config file at `~/.config/skydrop/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Booking wizard configuration.
    pub booking: BookingConfig,
    /// Tracking timeline configuration.
    pub tracking: TrackingConfig,
    /// Dashboard configuration.
    pub dashboard: DashboardConfig,
    /// Map widget configuration.
    pub maps: MapSettings,
    /// Session configuration.
    pub session: SessionConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/skydrop/orders.db`
    pub database_path: Option<PathBuf>,
}

/// Booking wizard configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingConfig {
    /// Simulated payment processing time in milliseconds.
    pub processing_delay_ms: u64,
}

/// Tracking timeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Seconds after mount at which the delivery is in transit.
    pub in_transit_after_secs: u64,
    /// Seconds after mount at which the delivery is delivered.
    pub delivered_after_secs: u64,
}

/// Dashboard configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Interval between auto-delivery sweeps in seconds.
    pub sweep_interval_secs: u64,
    /// Age in seconds after which an order is marked delivered.
    pub auto_deliver_after_secs: u64,
}

/// Session configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Identity of the signed-in user, usually an email address.
    pub user_id: Option<String>,
    /// Name used in greetings. Defaults to the local part of `user_id`.
    pub display_name: Option<String>,
    /// Role of the signed-in user.
    pub role: Role,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            processing_delay_ms: 2_000,
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            in_transit_after_secs: 15,
            delivered_after_secs: 30,
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 10,
            auto_deliver_after_secs: 60,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `SKYDROP_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.tracking.in_transit_after_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "in_transit_after_secs must be greater than 0".to_string(),
            });
        }

        if self.tracking.delivered_after_secs <= self.tracking.in_transit_after_secs {
            return Err(Error::ConfigValidation {
                message: format!(
                    "delivered_after_secs ({}) must be greater than in_transit_after_secs ({})",
                    self.tracking.delivered_after_secs, self.tracking.in_transit_after_secs
                ),
            });
        }

        if self.dashboard.sweep_interval_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "sweep_interval_secs must be greater than 0".to_string(),
            });
        }

        if self.maps.request_timeout_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "maps request_timeout_secs must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the payment processing delay as a Duration.
    #[must_use]
    pub fn processing_delay(&self) -> Duration {
        Duration::from_millis(self.booking.processing_delay_ms)
    }

    /// Get the in-transit threshold as a Duration.
    #[must_use]
    pub fn in_transit_after(&self) -> Duration {
        Duration::from_secs(self.tracking.in_transit_after_secs)
    }

    /// Get the delivered threshold as a Duration.
    #[must_use]
    pub fn delivered_after(&self) -> Duration {
        Duration::from_secs(self.tracking.delivered_after_secs)
    }

    /// Get the sweep interval as a Duration.
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.dashboard.sweep_interval_secs)
    }

    /// Get the auto-delivery age as a Duration.
    #[must_use]
    pub fn auto_deliver_after(&self) -> Duration {
        Duration::from_secs(self.dashboard.auto_deliver_after_secs)
    }
}
