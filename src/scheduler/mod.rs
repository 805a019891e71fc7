//! The poll loop that decides when bots post.
//!
//! Each tick loads every bot, runs the ones that are due concurrently, records
//! the outcome on each record, and saves the store once. A failing bot never
//! stops another; it simply waits for its next scheduled run.
//!
//! ```text
//! tick ─ load ─┬─ bot A (due)      → render → publish → next_run = now + schedule
//!              ├─ bot B (disabled) → skipped
//!              ├─ bot C (not due)  → skipped
//!              └─ bot D (bad JSON) → last_error set, next_run unchanged
//!        save ─┘
//! ```

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::bot::{BotRecord, BotStore, find_bot_index};
use crate::config::GlobalConfig;
use crate::constants::{MEDIA_FETCH_TIMEOUT, SCRIPT_PARSE_ERROR_MESSAGE};
use crate::grammar::TraceryEngine;
use crate::media::MediaResolver;
use crate::publish::{HttpFetcher, HttpPublisher, PublishReceipt, Publisher};
use crate::render::ContentRenderer;

/// What a bot needs to post once.
pub struct BotSession {
    pub renderer: ContentRenderer,
    pub publisher: Arc<dyn Publisher>,
}

/// Builds the renderer and publisher for a bot.
#[async_trait]
pub trait PostingBackend: Send + Sync {
    async fn session(&self, bot: &BotRecord) -> Result<BotSession>;
}

/// Real HTTP backend: one publisher per bot account, shared fetcher.
pub struct HttpBackend {
    fetcher: Arc<HttpFetcher>,
    api_base: String,
    max_concurrent_fetches: usize,
}

impl HttpBackend {
    pub fn new(config: &GlobalConfig) -> Result<Self> {
        Ok(Self {
            fetcher: Arc::new(HttpFetcher::new(MEDIA_FETCH_TIMEOUT)?),
            api_base: config.api_base.clone(),
            max_concurrent_fetches: config.max_concurrent_fetches,
        })
    }
}

#[async_trait]
impl PostingBackend for HttpBackend {
    async fn session(&self, bot: &BotRecord) -> Result<BotSession> {
        let api_base = bot.credentials.api_base.as_deref().unwrap_or(&self.api_base);
        let publisher = Arc::new(
            HttpPublisher::new(api_base, bot.credentials.access_token.clone())
                .with_context(|| format!("Failed to create publisher for bot '{}'", bot.id))?,
        );
        let renderer = ContentRenderer::new(
            Arc::new(TraceryEngine::new()),
            MediaResolver::new(self.fetcher.clone(), publisher.clone()),
        )
        .with_concurrency(self.max_concurrent_fetches);

        Ok(BotSession {
            renderer,
            publisher,
        })
    }
}

/// How one bot's run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Posted(PublishReceipt),
    /// The script is not a valid grammar; the bot stays due
    InvalidScript,
    /// Rendering, publishing or session setup failed
    Failed(String),
}

/// Summary of one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Bots that were due and ran, with their outcome
    pub ran: Vec<(String, RunOutcome)>,
    /// Bots that were disabled or not yet due
    pub skipped: Vec<String>,
}

impl TickReport {
    #[must_use]
    pub fn posted(&self) -> usize {
        self.ran.iter().filter(|(_, outcome)| matches!(outcome, RunOutcome::Posted(_))).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.ran.len() - self.posted()
    }
}

fn posting_error(code: &str, message: &str) -> String {
    format!("Error posting with error code: {code} | Error message: {message}")
}

/// Runs due bots on a fixed poll interval.
pub struct Scheduler {
    store: Arc<dyn BotStore>,
    backend: Arc<dyn PostingBackend>,
    poll_interval: Duration,
}

impl Scheduler {
    pub fn new(store: Arc<dyn BotStore>, backend: Arc<dyn PostingBackend>, poll_interval: Duration) -> Self {
        Self {
            store,
            backend,
            poll_interval,
        }
    }

    /// Run one tick at the current time.
    pub async fn tick(&self) -> Result<TickReport> {
        self.tick_at(Utc::now()).await
    }

    /// Run one tick as if the time were `now`.
    pub async fn tick_at(&self, now: DateTime<Utc>) -> Result<TickReport> {
        let mut bots = self.store.load().await.context("Failed to load bots")?;
        let mut report = TickReport::default();

        let mut due = Vec::new();
        for bot in &mut bots {
            if bot.is_due(now) {
                due.push(bot);
            } else {
                debug!("Skipping bot '{}'", bot.id);
                report.skipped.push(bot.id.clone());
            }
        }

        let outcomes = join_all(due.into_iter().map(|bot| self.run_bot(bot, now))).await;
        report.ran = outcomes;

        self.store.save(&bots).await.context("Failed to save bots")?;
        info!(
            "Tick finished: {} posted, {} failed, {} skipped",
            report.posted(),
            report.failed(),
            report.skipped.len()
        );
        Ok(report)
    }

    /// Post once for `bot` and record the outcome on it.
    pub async fn run_bot(&self, bot: &mut BotRecord, now: DateTime<Utc>) -> (String, RunOutcome) {
        bot.last_error = None;
        bot.last_run = Some(now);

        let Ok(source) = bot.template() else {
            warn!("Bot '{}' has an invalid script", bot.id);
            bot.last_error = Some(SCRIPT_PARSE_ERROR_MESSAGE.to_string());
            return (bot.id.clone(), RunOutcome::InvalidScript);
        };

        let outcome = match self.backend.session(bot).await {
            Ok(session) => match session.renderer.post(&source, session.publisher.as_ref()).await {
                Ok(receipt) => {
                    info!("Bot '{}' posted {}", bot.id, receipt.id);
                    RunOutcome::Posted(receipt)
                }
                Err(e) => {
                    error!("Bot '{}' failed to post: {}", bot.id, e);
                    bot.last_error = Some(posting_error(&e.code(), &e.message()));
                    RunOutcome::Failed(e.to_string())
                }
            },
            Err(e) => {
                error!("Bot '{}' could not start a session: {:#}", bot.id, e);
                bot.last_error = Some(posting_error("session", &format!("{e:#}")));
                RunOutcome::Failed(e.to_string())
            }
        };

        bot.next_run = Some(bot.next_run_after(now));
        (bot.id.clone(), outcome)
    }

    /// Post for one bot right away, regardless of its schedule, and save the result.
    ///
    /// Disabled bots are posted too; `postbot post` is an explicit request.
    pub async fn run_now(&self, query: &str) -> Result<RunOutcome> {
        let mut bots = self.store.load().await.context("Failed to load bots")?;
        let index = find_bot_index(&bots, query)?;
        let (_, outcome) = self.run_bot(&mut bots[index], Utc::now()).await;

        self.store.save(&bots).await.context("Failed to save bots")?;
        Ok(outcome)
    }

    /// Tick immediately, then every poll interval, until ctrl-c.
    pub async fn run(&self) -> Result<()> {
        info!("Scheduler started, polling every {:?}", self.poll_interval);
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        error!("Scheduler tick failed: {:#}", e);
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received ctrl-c, stopping scheduler");
                    return Ok(());
                }
            }
        }
    }
}
