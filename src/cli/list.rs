//! `postbot list`: configured bots and their schedule.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use super::OutputFormat;
use super::common::load_bots;
use crate::bot::BotRecord;
use crate::config::GlobalConfig;

#[derive(Args)]
pub struct ListCommand {
    /// Output format: text or json
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// What `list` shows about a bot. Credentials and scripts are left out.
#[derive(Debug, Serialize)]
struct BotSummary<'a> {
    id: &'a str,
    name: &'a str,
    disabled: bool,
    schedule: u64,
    next_run: Option<DateTime<Utc>>,
    last_run: Option<DateTime<Utc>>,
    last_error: Option<&'a str>,
}

impl<'a> From<&'a BotRecord> for BotSummary<'a> {
    fn from(bot: &'a BotRecord) -> Self {
        Self {
            id: &bot.id,
            name: &bot.name,
            disabled: bot.disabled,
            schedule: bot.schedule,
            next_run: bot.next_run,
            last_run: bot.last_run,
            last_error: bot.last_error.as_deref(),
        }
    }
}

/// Render a schedule in seconds as the largest whole unit.
fn format_schedule(secs: u64) -> String {
    match secs {
        s if s > 0 && s % 86_400 == 0 => format!("{}d", s / 86_400),
        s if s > 0 && s % 3_600 == 0 => format!("{}h", s / 3_600),
        s if s > 0 && s % 60 == 0 => format!("{}m", s / 60),
        s => format!("{s}s"),
    }
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M UTC").to_string())
}

impl ListCommand {
    pub async fn execute(self, config: &GlobalConfig) -> Result<()> {
        let bots = load_bots(config).await?;

        if self.format == OutputFormat::Json {
            let summaries: Vec<BotSummary> = bots.iter().map(BotSummary::from).collect();
            println!("{}", serde_json::to_string_pretty(&summaries)?);
            return Ok(());
        }

        if bots.is_empty() {
            println!("No bots configured.");
            return Ok(());
        }

        println!(
            "{:<20} {:<24} {:<9} {:<8} {:<21}",
            "ID".bold(),
            "NAME".bold(),
            "STATUS".bold(),
            "EVERY".bold(),
            "NEXT RUN".bold()
        );
        for bot in &bots {
            let status = if bot.disabled { "disabled".bright_black() } else { "enabled".green() };
            println!(
                "{:<20} {:<24} {:<9} {:<8} {:<21}",
                bot.id,
                bot.name,
                status,
                format_schedule(bot.schedule),
                format_time(bot.next_run)
            );
            if let Some(error) = &bot.last_error {
                println!("    {} {}", "last error:".red(), error);
            }
        }
        println!("\n{}: {} bot(s)", "Total".green().bold(), bots.len());
        Ok(())
    }
}
