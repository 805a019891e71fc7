//! Bot records and their persistence.
//!
//! A bot is a named grammar script plus a schedule and the credentials of the
//! account it posts to. Bots live in a TOML store file:
//!
//! ```toml
//! [[bots]]
//! id = "owl-facts"
//! name = "Owl Facts"
//! schedule = 3600
//! script = '''
//! {"origin": ["#fact# {img https://example.com/owl.png}"], "fact": ["Owls can rotate their heads 270 degrees."]}
//! '''
//!
//! [bots.credentials]
//! access_token = "..."
//! ```

pub mod store;

pub use store::{BotStore, FileStore};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strsim::levenshtein;

use crate::core::PostbotError;
use crate::grammar::{GrammarError, TemplateSource};

/// Account credentials for the publishing service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Pre-issued bearer token
    pub access_token: String,
    /// Overrides the configured API root for this bot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

/// One scheduled bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotRecord {
    pub id: String,
    pub name: String,

    #[serde(default)]
    pub disabled: bool,

    /// Seconds between runs
    pub schedule: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_run: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<DateTime<Utc>>,

    /// Outcome of the last run; `None` after a clean run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,

    /// JSON grammar source
    pub script: String,

    #[serde(default)]
    pub credentials: Credentials,
}

impl BotRecord {
    /// A bot is due when it is enabled and its next run is not in the future.
    ///
    /// A bot that has never run has no `next_run` and is due immediately.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.disabled && self.next_run.is_none_or(|next| next <= now)
    }

    /// Parse the bot's script.
    pub fn template(&self) -> Result<TemplateSource, GrammarError> {
        TemplateSource::from_json(&self.script)
    }

    /// When the bot should run next if it ran at `now`.
    ///
    /// Schedules too large to represent saturate at the maximum timestamp.
    #[must_use]
    pub fn next_run_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        i64::try_from(self.schedule)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|schedule| now.checked_add_signed(schedule))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Find a bot by id or name.
///
/// Ids are matched first; names are matched case-insensitively. On a miss
/// the error carries up to three similar ids or names.
pub fn find_bot<'a>(bots: &'a [BotRecord], query: &str) -> Result<&'a BotRecord, PostbotError> {
    find_bot_index(bots, query).map(|index| &bots[index])
}

/// Position of the bot [`find_bot`] would return.
pub fn find_bot_index(bots: &[BotRecord], query: &str) -> Result<usize, PostbotError> {
    bots.iter()
        .position(|bot| bot.id == query)
        .or_else(|| bots.iter().position(|bot| bot.name.eq_ignore_ascii_case(query)))
        .ok_or_else(|| PostbotError::BotNotFound {
            name: query.to_string(),
            suggestions: similar_bots(bots, query),
        })
}

fn similar_bots(bots: &[BotRecord], query: &str) -> Vec<String> {
    let threshold = query.len().max(2) / 2;
    let mut scored: Vec<(usize, &str)> = bots
        .iter()
        .flat_map(|bot| [bot.id.as_str(), bot.name.as_str()])
        .map(|candidate| (levenshtein(&query.to_lowercase(), &candidate.to_lowercase()), candidate))
        .filter(|(distance, _)| *distance <= threshold)
        .collect();

    scored.sort();
    let mut suggestions: Vec<String> = Vec::new();
    for (_, candidate) in scored {
        if !suggestions.iter().any(|s| s == candidate) {
            suggestions.push(candidate.to_string());
        }
    }
    suggestions.truncate(3);
    suggestions
}
