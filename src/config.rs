//! Application configuration: a single toml file under the user config
//! directory. A missing file is not an error — defaults are written out
//! and used, so the controller comes up on first boot without manual
//! setup.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::mqtt::config::MqttConfig;

const CONFIG_DIR: &str = "ledcontroller";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid broker address '{url}': {reason}")]
    BrokerAddress { url: String, reason: String },
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct Config {
    pub mqtt: MqttConfig,
    pub led: LedConfig,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct LedConfig {
    /// BCM pin number of the LED output
    pub pin: u8,
}

impl Default for LedConfig {
    fn default() -> Self {
        // GPIO 2 matches the on-board LED wiring of the reference board
        Self { pin: 2 }
    }
}

impl Config {
    /// Loads the config file, writing defaults first if it is missing.
    pub fn load_or_init() -> Result<Self, ConfigError> {
        let path = Self::config_path();
        if path.exists() {
            let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            let config = Self::from_toml(&content)?;
            info!(path = %path.display(), "Configuration loaded");
            return Ok(config);
        }

        warn!(path = %path.display(), "No config file found, writing defaults");
        let config = Self::default();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: path.clone(),
                source,
            })?;
        }
        let content = toml::to_string_pretty(&config)?;
        fs::write(&path, content).map_err(|source| ConfigError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_DIR)
            .join(CONFIG_FILE)
    }
}
