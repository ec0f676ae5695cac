use std::path::{Path, PathBuf};

use anyhow::Error;
use log::info;
use serde::{Deserialize, Serialize};

use crate::{icon::IconTemplate, serial::DEFAULT_BAUD};

pub const DEFAULT_CONFIG_PATH: &str = "config.ron";

#[derive(Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub serial: SerialConfig,
    /// SVG file used instead of the built-in swatch
    pub icon_template: Option<PathBuf>,
    /// Where the preset list and the rest of the session are kept
    pub session: PathBuf,
}

#[derive(Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SerialConfig {
    pub port: Option<String>,
    pub baud_rate: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            serial: SerialConfig::default(),
            icon_template: None,
            session: PathBuf::from("session.ron"),
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: DEFAULT_BAUD,
        }
    }
}

impl Config {
    /// Load the config, falling back to defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Config, Error> {
        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Ok(Config::default());
        }

        let config = std::fs::read_to_string(path)?;
        let config: Config = ron::from_str(&config)?;
        Ok(config)
    }

    /// Port to use: the one asked for, else the last one used, else the configured one
    pub fn resolve_port(&self, requested: Option<&str>, last_used: Option<&str>) -> Option<String> {
        requested
            .or(last_used)
            .or(self.serial.port.as_deref())
            .map(str::to_string)
    }

    pub fn icon_template(&self) -> IconTemplate {
        match &self.icon_template {
            Some(path) => IconTemplate::from_file(path),
            None => IconTemplate::embedded(),
        }
    }
}
