//! Configuration loader and validator
//!
//! Loads bridge configuration from TOML files in the configs/ directory.

use crate::athome::discovery::DiscoveryLogging;
use crate::input::{FilterParams, InputLogging, TouchpadGeometry};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Touch filter tunables
    #[serde(default)]
    pub filter: FilterParams,

    /// Physical touchpad size
    #[serde(default)]
    pub touchpad: TouchpadGeometry,

    #[serde(default)]
    pub logging: LoggingSettings,

    #[serde(default)]
    pub registry: RegistrySettings,

    #[serde(default)]
    pub queue: QueueSettings,
}

/// Log level and verbose switches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default filter when RUST_LOG is not set
    #[serde(default = "default_level")]
    pub level: String,

    /// Log every advertising report
    #[serde(default)]
    pub log_discovery: bool,

    /// Log advertising reports from registered remotes
    #[serde(default)]
    pub log_discovery_known: bool,

    /// Log finger and button changes
    #[serde(default = "default_true")]
    pub log_input_events: bool,

    /// Log every filtered touch sample
    #[serde(default)]
    pub log_input_spew: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            log_discovery: false,
            log_discovery_known: false,
            log_input_events: true,
            log_input_spew: false,
        }
    }
}

impl LoggingSettings {
    pub fn discovery(&self) -> DiscoveryLogging {
        DiscoveryLogging {
            all: self.log_discovery,
            known: self.log_discovery_known,
        }
    }

    pub fn input(&self) -> InputLogging {
        InputLogging {
            events: self.log_input_events,
            spew: self.log_input_spew,
        }
    }
}

/// Known-remote persistence
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySettings {
    /// JSON file holding known remotes; kept in memory only when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// User event queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSettings {
    #[serde(default = "default_queue_capacity")]
    pub user_queue_capacity: usize,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            user_queue_capacity: default_queue_capacity(),
        }
    }
}

fn default_true() -> bool { true }
fn default_level() -> String { "info".to_string() }
fn default_queue_capacity() -> usize { 64 }

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        info!("Loading configuration from: {}", path_ref.display());

        let content = std::fs::read_to_string(path_ref)?;
        let config = Self::from_toml(&content)?;

        debug!("  - Filter: {:?}", config.filter);
        debug!("  - Touchpad: {}x{} mm", config.touchpad.width_mm, config.touchpad.height_mm);
        debug!("  - Registry: {:?}", config.registry.path);

        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load default configuration from configs/default.toml
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load("configs/default.toml")
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.filter.alpha > 100 {
            return Err(ConfigError::Invalid(
                "filter.alpha must be between 0 and 100".into()
            ));
        }

        if self.filter.beta > 100 {
            return Err(ConfigError::Invalid(
                "filter.beta must be between 0 and 100".into()
            ));
        }

        if self.touchpad.width_mm == 0 || self.touchpad.height_mm == 0 {
            return Err(ConfigError::Invalid(
                "touchpad dimensions must be positive".into()
            ));
        }

        if self.queue.user_queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "queue.user_queue_capacity must be positive".into()
            ));
        }

        Ok(())
    }
}
