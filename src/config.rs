//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the API base URL and the last used username.
//!
//! Configuration is stored at `~/.config/pretium-tui/config.json`.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "pretium-tui";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Fallback API base URL when neither env nor config provide one.
/// Matches the backend's local development default.
const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/api/";

/// Environment variable overriding the API base URL
const API_BASE_URL_ENV: &str = "PRETIUM_API_BASE_URL";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_base_url: Option<String>,
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

    /// Resolve the API base URL: env var, then config file, then default.
    /// Always ends with a trailing slash so endpoint paths can be appended.
    pub fn api_base_url(&self) -> String {
        let url = std::env::var(API_BASE_URL_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| self.api_base_url.clone());
        normalize_base_url(url.as_deref())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding the persisted session (and saved QR images).
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}

/// Normalize a base URL: fall back to the default when absent, and make
/// sure it ends with a slash.
fn normalize_base_url(url: Option<&str>) -> String {
    match url {
        None | Some("") => DEFAULT_API_BASE_URL.to_string(),
        Some(u) if u.ends_with('/') => u.to_string(),
        Some(u) => format!("{}/", u),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url_default() {
        assert_eq!(normalize_base_url(None), DEFAULT_API_BASE_URL);
        assert_eq!(normalize_base_url(Some("")), DEFAULT_API_BASE_URL);
    }

    #[test]
    fn test_normalize_base_url_adds_trailing_slash() {
        assert_eq!(
            normalize_base_url(Some("https://portal.example.com/api")),
            "https://portal.example.com/api/"
        );
    }

    #[test]
    fn test_normalize_base_url_keeps_trailing_slash() {
        assert_eq!(
            normalize_base_url(Some("https://portal.example.com/api/")),
            "https://portal.example.com/api/"
        );
    }
}
