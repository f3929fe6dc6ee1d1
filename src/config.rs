use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Result, anyhow};

use crate::webhook::DEFAULT_WEBHOOK_URL;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub webhook_url: Option<String>,
    /// Unset means requests may wait as long as the network layer allows.
    pub request_timeout_secs: Option<u64>,
    pub log_file: Option<PathBuf>,
}

/// Effective settings after layering CLI/env over the config file over defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub webhook_url: String,
    pub request_timeout: Option<Duration>,
    /// None when no path was given and the platform has no data directory.
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Layer explicit overrides on top of this config.
    pub fn resolve(
        &self,
        webhook_url: Option<String>,
        timeout_secs: Option<u64>,
        log_file: Option<PathBuf>,
    ) -> Settings {
        let webhook_url = webhook_url
            .or_else(|| self.webhook_url.clone())
            .unwrap_or_else(|| DEFAULT_WEBHOOK_URL.to_string());

        let request_timeout = timeout_secs
            .or(self.request_timeout_secs)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let log_file = log_file
            .or_else(|| self.log_file.clone())
            .or_else(Self::default_log_path);

        Settings {
            webhook_url,
            request_timeout,
            log_file,
        }
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("weather-chat").join("config.json"))
    }

    fn default_log_path() -> Option<PathBuf> {
        dirs::data_local_dir().map(|dir| dir.join("weather-chat").join("weather-chat.log"))
    }
}
