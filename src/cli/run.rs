//! `postbot run`: the scheduler loop.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::common::http_scheduler;
use crate::config::GlobalConfig;
use crate::scheduler::RunOutcome;

#[derive(Args)]
pub struct RunCommand {
    /// Run a single tick and exit
    #[arg(long)]
    pub once: bool,
}

impl RunCommand {
    pub async fn execute(self, config: &GlobalConfig) -> Result<()> {
        let scheduler = http_scheduler(config)?;
        if !self.once {
            return scheduler.run().await;
        }

        let report = scheduler.tick().await?;
        for (bot, outcome) in &report.ran {
            match outcome {
                RunOutcome::Posted(receipt) => println!("{} {} posted {}", "✓".green(), bot, receipt.id),
                RunOutcome::InvalidScript => println!("{} {} has an invalid script", "✗".red(), bot),
                RunOutcome::Failed(reason) => println!("{} {}: {}", "✗".red(), bot, reason),
            }
        }
        println!(
            "{} posted, {} failed, {} skipped",
            report.posted(),
            report.failed(),
            report.skipped.len()
        );
        Ok(())
    }
}
