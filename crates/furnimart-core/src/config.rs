//! Application configuration management.
//!
//! This module handles loading and saving the client configuration: which
//! API to talk to, where session tokens are kept, and the last username.
//!
//! Configuration is stored at `~/.config/furnimart/config.json`. The API
//! base URL can be overridden with `FURNIMART_API_URL`, and
//! `FURNIMART_MODE` selects development or deployed defaults.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::auth::{FileTokenStore, KeyringTokenStore, TokenStore};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "furnimart";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const API_URL_ENV: &str = "FURNIMART_API_URL";
pub const MODE_ENV: &str = "FURNIMART_MODE";

/// Local development server started by the backend's runserver
const DEVELOPMENT_API_URL: &str = "http://127.0.0.1:8000";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Development,
    Deployed,
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Mode::Development),
            "deployed" | "production" | "prod" => Ok(Mode::Deployed),
            other => bail!("Unknown mode '{}' (expected development or deployed)", other),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Development => f.write_str("development"),
            Mode::Deployed => f.write_str("deployed"),
        }
    }
}

/// Where session tokens are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TokenStorage {
    #[default]
    File,
    Keyring,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub mode: Option<Mode>,
    #[serde(default)]
    pub token_storage: TokenStorage,
    #[serde(default)]
    pub last_username: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
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

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Effective mode: `FURNIMART_MODE`, then the config file, then development.
    pub fn mode(&self) -> Result<Mode> {
        match std::env::var(MODE_ENV) {
            Ok(value) if !value.trim().is_empty() => value.parse(),
            _ => Ok(self.mode.unwrap_or_default()),
        }
    }

    /// Effective API base URL for the current environment.
    pub fn api_base_url(&self) -> Result<String> {
        let from_env = std::env::var(API_URL_ENV).ok();
        resolve_api_url(from_env.as_deref(), self.api_url.as_deref(), self.mode()?)
    }

    /// Open the configured token store. Created once at startup and shared
    /// for the life of the process.
    pub fn token_store(&self) -> Result<Arc<dyn TokenStore>> {
        Ok(match self.token_storage {
            TokenStorage::File => Arc::new(FileTokenStore::new(&self.cache_dir()?)),
            TokenStorage::Keyring => Arc::new(KeyringTokenStore::new()),
        })
    }
}

/// Pick the API base URL: explicit environment override, then the configured
/// URL, then the mode default. Deployed mode has no default.
pub fn resolve_api_url(from_env: Option<&str>, configured: Option<&str>, mode: Mode) -> Result<String> {
    let chosen = [from_env, configured]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|url| !url.is_empty());

    let url = match (chosen, mode) {
        (Some(url), _) => url.to_string(),
        (None, Mode::Development) => DEVELOPMENT_API_URL.to_string(),
        (None, Mode::Deployed) => bail!(
            "No API URL configured for deployed mode; set {} or api_url in the config file",
            API_URL_ENV
        ),
    };

    if !(url.starts_with("http://") || url.starts_with("https://")) {
        bail!("API URL must start with http:// or https://, got '{}'", url);
    }
    Ok(url.trim_end_matches('/').to_string())
}
