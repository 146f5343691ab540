//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the forge server URL and the last used username.
//!
//! Configuration is stored at `~/.config/forgedeck/config.json`. The
//! `FORGE_SERVER_URL` environment variable overrides the configured server.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config/session directory paths
const APP_NAME: &str = "forgedeck";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding the configured server URL
const SERVER_URL_ENV: &str = "FORGE_SERVER_URL";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub server_url: Option<String>,
    pub last_username: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Effective server URL: environment override first, then the config
    /// file.
    pub fn server_url(&self) -> Result<String> {
        if let Ok(url) = std::env::var(SERVER_URL_ENV) {
            if !url.is_empty() {
                return Ok(url);
            }
        }
        self.server_url
            .clone()
            .ok_or_else(|| anyhow::anyhow!("No server configured. Set {} or server_url in the config file", SERVER_URL_ENV))
    }

    /// Session directory for a server, scoped by host so sessions against
    /// different forges do not collide.
    pub fn session_dir(server_url: &str) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir
            .join(APP_NAME)
            .join(Self::host_slug(server_url))
            .join("session"))
    }

    /// Reduce a server URL to a filesystem-safe directory name.
    fn host_slug(server_url: &str) -> String {
        let trimmed = server_url
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/');
        trimmed
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_slug() {
        assert_eq!(
            Config::host_slug("https://forge.example.com/"),
            "forge.example.com"
        );
        assert_eq!(
            Config::host_slug("http://localhost:3000"),
            "localhost_3000"
        );
    }
}
