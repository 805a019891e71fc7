//! Shared helpers for the integration suite.

use anyhow::Result;
use assert_cmd::Command;
use postbot::bot::{BotRecord, BotStore, FileStore};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// An isolated config file and bot store in a temporary directory.
pub struct TestEnv {
    temp: TempDir,
}

impl TestEnv {
    pub fn new() -> Result<Self> {
        let env = Self {
            temp: TempDir::new()?,
        };
        // Points at a closed local port so nothing ever reaches a real service.
        std::fs::write(
            env.config_path(),
            format!(
                "store_path = {:?}\npoll_interval_secs = 60\napi_base = \"http://127.0.0.1:9\"\n",
                env.store_path().display().to_string()
            ),
        )?;
        Ok(env)
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.temp.path().join("config.toml")
    }

    pub fn store_path(&self) -> PathBuf {
        self.temp.path().join("bots.toml")
    }

    pub fn store(&self) -> FileStore {
        FileStore::new(self.store_path())
    }

    pub async fn write_bots(&self, bots: &[BotRecord]) -> Result<()> {
        self.store().save(bots).await
    }

    pub async fn read_bots(&self) -> Result<Vec<BotRecord>> {
        self.store().load().await
    }

    /// The postbot binary, configured for this environment.
    pub fn postbot(&self) -> Command {
        let mut cmd = Command::cargo_bin("postbot").expect("postbot binary is built");
        cmd.env("POSTBOT_CONFIG", self.config_path())
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG")
            .current_dir(self.path());
        cmd
    }
}
