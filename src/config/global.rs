//! Global configuration for postbot.
//!
//! The configuration file lives at `~/.postbot/config.toml` (or
//! `%LOCALAPPDATA%\postbot\config.toml` on Windows). `--config` and the
//! `POSTBOT_CONFIG` environment variable point elsewhere. A missing file means
//! defaults.
//!
//! ```toml
//! # Where bot records are stored. `~` and `$VARS` are expanded.
//! store_path = "~/.postbot/bots.toml"
//!
//! # Seconds between scheduler polls
//! poll_interval_secs = 900
//!
//! # Media directives resolved at once within a single post
//! max_concurrent_fetches = 4
//!
//! # Root of the publishing API; bots may override it in their credentials
//! api_base = "https://api.x.com"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::constants::{DEFAULT_API_BASE, DEFAULT_MAX_CONCURRENT_FETCHES, DEFAULT_POLL_INTERVAL_SECS};
use crate::core::PostbotError;

fn default_store_path() -> String {
    "~/.postbot/bots.toml".to_string()
}

const fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

const fn default_max_concurrent_fetches() -> usize {
    DEFAULT_MAX_CONCURRENT_FETCHES
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

/// User-wide postbot settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Bot store location, before `~`/`$VAR` expansion
    #[serde(default = "default_store_path")]
    pub store_path: String,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            poll_interval_secs: default_poll_interval_secs(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            api_base: default_api_base(),
        }
    }
}

impl GlobalConfig {
    /// Load from the default location, falling back to defaults if the file is missing.
    pub async fn load() -> Result<Self> {
        Self::load_with_optional(None).await
    }

    /// Load from `path` when given, else from the default location.
    ///
    /// A missing file yields the default configuration.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };
        if path.exists() {
            Self::load_from(&path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load and validate the configuration at `path`.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration to `path` as TOML, owner-readable only on Unix.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write config to {}", path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let mut perms = fs::metadata(path)
                .await
                .with_context(|| format!("Failed to read permissions for {}", path.display()))?
                .permissions();
            perms.set_mode(0o600);
            fs::set_permissions(path, perms).await.with_context(|| {
                format!("Failed to set secure permissions on {}", path.display())
            })?;
        }

        Ok(())
    }

    /// Platform default config location.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("postbot")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".postbot")
        };

        Ok(config_dir.join("config.toml"))
    }

    /// Reject values the scheduler and renderer cannot run with.
    pub fn validate(&self) -> Result<(), PostbotError> {
        if self.poll_interval_secs == 0 {
            return Err(PostbotError::ConfigError {
                message: "poll_interval_secs must be greater than zero".to_string(),
            });
        }
        if self.max_concurrent_fetches == 0 {
            return Err(PostbotError::ConfigError {
                message: "max_concurrent_fetches must be greater than zero".to_string(),
            });
        }
        if !(self.api_base.starts_with("http://") || self.api_base.starts_with("https://")) {
            return Err(PostbotError::ConfigError {
                message: format!("api_base must be an http(s) URL, got '{}'", self.api_base),
            });
        }
        Ok(())
    }

    /// The bot store path with `~` and environment variables expanded.
    pub fn store_path(&self) -> Result<PathBuf> {
        let expanded = shellexpand::full(&self.store_path).with_context(|| {
            format!(
                "Failed to expand store_path '{}'. Check that every $VARIABLE it uses is set",
                self.store_path
            )
        })?;
        Ok(PathBuf::from(expanded.into_owned()))
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}
