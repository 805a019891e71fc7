//! Helpers shared by CLI commands.

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::bot::{BotRecord, BotStore, FileStore};
use crate::config::GlobalConfig;
use crate::scheduler::{HttpBackend, Scheduler};

/// Open the bot store named by the configuration.
pub fn open_store(config: &GlobalConfig) -> Result<FileStore> {
    Ok(FileStore::new(config.store_path()?))
}

/// Load every bot from the configured store.
pub async fn load_bots(config: &GlobalConfig) -> Result<Vec<BotRecord>> {
    let store = open_store(config)?;
    store
        .load()
        .await
        .with_context(|| format!("Failed to load bots from {}", store.path().display()))
}

/// A scheduler posting over HTTP against the configured store.
pub fn http_scheduler(config: &GlobalConfig) -> Result<Scheduler> {
    Ok(Scheduler::new(
        Arc::new(open_store(config)?),
        Arc::new(HttpBackend::new(config)?),
        config.poll_interval(),
    ))
}
