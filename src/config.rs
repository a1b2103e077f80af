//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the prayer-config.toml file.
//! It provides a centralized way to configure the prayer-time API, location handling,
//! the arc geometry and the refresh cadence.

use crate::location::{Coordinates, FALLBACK_COORDS};
use crate::wave::Ellipse;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default config file, looked up in the working directory
pub const CONFIG_FILE: &str = "prayer-config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("config serialization: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Application configuration loaded from prayer-config.toml
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Prayer-time API settings
    pub api: ApiConfig,
    /// Where to compute prayer times for
    pub location: LocationConfig,
    /// Arc geometry and refresh cadence
    pub display: DisplayConfig,
}

/// Remote prayer-time API configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Base URL; `/timings` is appended
    pub base_url: String,
    /// Calculation method id (2 = ISNA)
    pub method: u8,
    /// Juristic school for Asr (0 = Shafi, 1 = Hanafi)
    pub school: u8,
    /// Per-request timeout
    pub timeout_secs: u64,
    /// Periodic refetch interval
    pub refresh_minutes: u64,
}

/// Location configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LocationConfig {
    /// Fixed latitude; unset means "no location provider"
    pub latitude: Option<f64>,
    /// Fixed longitude; unset means "no location provider"
    pub longitude: Option<f64>,
    /// How long to wait for coordinates before falling back
    pub fallback_after_secs: u64,
    /// Coordinates used when no location arrives in time
    pub fallback: Coordinates,
}

/// Display and visualization configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DisplayConfig {
    /// Wave bounding ellipse in drawing units
    pub arc: Ellipse,
    /// Seconds between redraws
    pub tick_secs: u64,
    /// Canvas width in pixels
    pub width: u32,
    /// Canvas height in pixels
    pub height: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api: ApiConfig {
                base_url: "https://api.aladhan.com/v1".to_string(),
                method: 2,
                school: 1,
                timeout_secs: 10,
                refresh_minutes: 15,
            },
            location: LocationConfig {
                latitude: None,
                longitude: None,
                fallback_after_secs: 5,
                fallback: FALLBACK_COORDS,
            },
            display: DisplayConfig {
                arc: Ellipse::new(185.0, 170.0, 185.0, 50.0),
                tick_secs: 60,
                width: 370,
                height: 320,
            },
        }
    }
}

impl LocationConfig {
    /// Configured coordinates, if both halves are present and finite.
    pub fn coordinates(&self) -> Option<Coordinates> {
        Coordinates::new(self.latitude?, self.longitude?)
    }
}

impl Config {
    /// Load configuration from prayer-config.toml
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load() -> Self {
        Self::load_from_path(CONFIG_FILE)
    }

    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    log::info!("Loaded configuration from {}", path.display());
                    config
                }
                Err(e) => {
                    log::warn!("Invalid config file format: {}", e);
                    log::warn!("Using default configuration");
                    Self::default()
                }
            },
            Err(_) => {
                log::info!(
                    "No config file at {}, using default configuration",
                    path.display()
                );
                Self::default()
            }
        }
    }

    /// Save current configuration to the given path
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path.as_ref(), contents)?;
        log::info!("Configuration saved to {}", path.as_ref().display());
        Ok(())
    }

    /// Save current configuration to prayer-config.toml
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to_path(CONFIG_FILE)
    }
}
