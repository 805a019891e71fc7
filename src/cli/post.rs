//! `postbot post <bot>`: post once, ignoring the schedule.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::common::http_scheduler;
use crate::config::GlobalConfig;
use crate::constants::SCRIPT_PARSE_ERROR_MESSAGE;
use crate::core::PostbotError;
use crate::scheduler::RunOutcome;

#[derive(Args)]
pub struct PostCommand {
    /// Bot id or name
    pub bot: String,
}

impl PostCommand {
    /// Post for the bot and record the run in the store like a scheduled run would.
    pub async fn execute(self, config: &GlobalConfig) -> Result<()> {
        match http_scheduler(config)?.run_now(&self.bot).await? {
            RunOutcome::Posted(receipt) => {
                println!("{} Posted {}: {}", "✓".green(), receipt.id, receipt.text);
                Ok(())
            }
            RunOutcome::InvalidScript => Err(PostbotError::InvalidScript {
                bot: self.bot,
                reason: SCRIPT_PARSE_ERROR_MESSAGE.to_string(),
            }
            .into()),
            RunOutcome::Failed(reason) => Err(PostbotError::Other {
                message: format!("Bot '{}' failed to post: {}", self.bot, reason),
            }
            .into()),
        }
    }
}
