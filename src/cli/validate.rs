//! `postbot validate`: static checks over the bot store.
//!
//! Nothing is expanded or fetched. For every bot this reports:
//!
//! - scripts that are not a JSON grammar
//! - a missing `origin` symbol, unterminated tags or actions, undefined symbols
//! - a zero schedule or a duplicate id
//!
//! and warns about directives whose prefix is not `img`/`vid` (they are
//! silently dropped when posting) and bots without an access token.
//!
//! Any error makes the command fail; warnings never do.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::collections::HashSet;

use super::OutputFormat;
use super::common::load_bots;
use crate::bot::BotRecord;
use crate::config::GlobalConfig;
use crate::constants::START_SYMBOL;
use crate::core::PostbotError;
use crate::media::{parse_directive, scan_directives};

#[derive(Args)]
pub struct ValidateCommand {
    /// Output format: text or json
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Findings for one bot.
#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct BotReport {
    pub id: String,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl BotReport {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check every bot; reports come back in store order.
#[must_use]
pub fn check_bots(bots: &[BotRecord]) -> Vec<BotReport> {
    let mut seen = HashSet::new();
    bots.iter()
        .map(|bot| {
            let mut report = check_bot(bot);
            if !seen.insert(bot.id.as_str()) {
                report.errors.push(format!("duplicate bot id '{}'", bot.id));
            }
            report
        })
        .collect()
}

fn check_bot(bot: &BotRecord) -> BotReport {
    let mut report = BotReport {
        id: bot.id.clone(),
        ..BotReport::default()
    };

    if bot.schedule == 0 {
        report.errors.push("schedule must be greater than zero".to_string());
    }
    if bot.credentials.access_token.trim().is_empty() {
        report.warnings.push("no access_token; posting will be rejected".to_string());
    }

    let source = match bot.template() {
        Ok(source) => source,
        Err(e) => {
            report.errors.push(e.to_string());
            return report;
        }
    };

    report.errors.extend(source.lint(START_SYMBOL).iter().map(ToString::to_string));

    for symbol in source.symbols() {
        for rule in source.rules(symbol).unwrap_or_default() {
            for directive in scan_directives(rule) {
                if parse_directive(&directive.raw).is_none() {
                    report.warnings.push(format!(
                        "directive {} in '{}' is not img or vid and will be dropped",
                        directive.raw, symbol
                    ));
                }
            }
        }
    }

    report
}

impl ValidateCommand {
    pub async fn execute(self, config: &GlobalConfig) -> Result<()> {
        let bots = load_bots(config).await?;
        let reports = check_bots(&bots);
        let error_count: usize = reports.iter().map(|r| r.errors.len()).sum();

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
            OutputFormat::Text => print_text(&reports),
        }

        if error_count > 0 {
            return Err(PostbotError::ValidationFailed {
                count: error_count,
            }
            .into());
        }
        Ok(())
    }
}

fn print_text(reports: &[BotReport]) {
    if reports.is_empty() {
        println!("No bots configured.");
        return;
    }

    for report in reports {
        if report.is_valid() {
            println!("{} {}", "✓".green(), report.id);
        } else {
            println!("{} {}", "✗".red(), report.id);
        }
        for error in &report.errors {
            println!("    {} {}", "error:".red(), error);
        }
        for warning in &report.warnings {
            println!("    {} {}", "warning:".yellow(), warning);
        }
    }

    let valid = reports.iter().filter(|r| r.is_valid()).count();
    println!("\n{}/{} bot(s) valid", valid, reports.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::bot_record;

    #[test]
    fn test_clean_bot_has_no_findings() {
        let reports = check_bots(&[bot_record("owl", r#"{"origin": ["hoot {img http://a/b.png}"]}"#)]);
        assert_eq!(reports[0], BotReport {
            id: "owl".to_string(),
            ..BotReport::default()
        });
    }

    #[test]
    fn test_reports_script_problems() {
        let reports = check_bots(&[
            bot_record("json", "{nope"),
            bot_record("lint", r##"{"start": ["#animal#"]}"##),
        ]);
        assert_eq!(reports[0].errors.len(), 1);
        assert!(reports[0].errors[0].starts_with("invalid grammar source"));

        // missing origin plus undefined 'animal'
        assert_eq!(reports[1].errors.len(), 2);
    }

    #[test]
    fn test_warnings_do_not_invalidate() {
        let mut bot = bot_record("owl", r#"{"origin": ["hoot {gif http://a/b.gif}"]}"#);
        bot.credentials.access_token = " \n".to_string();
        let report = &check_bots(&[bot])[0];

        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 2);
        assert!(report.warnings.iter().any(|w| w.contains("{gif http://a/b.gif}")));
    }

    #[test]
    fn test_duplicate_ids_and_zero_schedule() {
        let mut second = bot_record("owl", r#"{"origin": ["x"]}"#);
        second.schedule = 0;
        let reports = check_bots(&[bot_record("owl", r#"{"origin": ["x"]}"#), second]);

        assert!(reports[0].is_valid());
        assert_eq!(reports[1].errors.len(), 2);
    }
}
