//! Bot persistence.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use super::BotRecord;
use crate::core::PostbotError;

/// Loads and saves the full set of bots.
#[async_trait]
pub trait BotStore: Send + Sync {
    async fn load(&self) -> Result<Vec<BotRecord>>;
    async fn save(&self, bots: &[BotRecord]) -> Result<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    bots: Vec<BotRecord>,
}

/// TOML file holding a `[[bots]]` array.
///
/// A missing file is an empty store. Saves go to a temporary file that is
/// renamed over the store, so readers never see a half-written file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn store_error(&self, reason: impl std::fmt::Display) -> PostbotError {
        PostbotError::StoreError {
            path: self.path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl BotStore for FileStore {
    async fn load(&self) -> Result<Vec<BotRecord>> {
        if !self.path.exists() {
            debug!("Bot store {} does not exist, starting empty", self.path.display());
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read bot store from {}", self.path.display()))?;

        let file: StoreFile = toml::from_str(&content).map_err(|e| self.store_error(e))?;
        debug!("Loaded {} bot(s) from {}", file.bots.len(), self.path.display());
        Ok(file.bots)
    }

    async fn save(&self, bots: &[BotRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create bot store directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(&StoreFile {
            bots: bots.to_vec(),
        })
        .map_err(|e| self.store_error(e))?;

        let temp_path = self.path.with_extension("toml.tmp");
        fs::write(&temp_path, content)
            .await
            .with_context(|| format!("Failed to write temp file: {}", temp_path.display()))?;

        // Bot records carry access tokens
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let mut perms = fs::metadata(&temp_path)
                .await
                .with_context(|| format!("Failed to read permissions for {}", temp_path.display()))?
                .permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&temp_path, perms).await.with_context(|| {
                format!("Failed to set secure permissions on {}", temp_path.display())
            })?;
        }

        fs::rename(&temp_path, &self.path)
            .await
            .with_context(|| format!("Failed to replace bot store {}", self.path.display()))?;

        debug!("Saved {} bot(s) to {}", bots.len(), self.path.display());
        Ok(())
    }
}
