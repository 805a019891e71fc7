//! `postbot render`: show what a bot would post.
//!
//! A stored bot is rendered for real: its media is fetched and uploaded to the
//! bot's account, but nothing is published. `--dry-run` and `--file` stay
//! offline and only list the media directives.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

use super::common::load_bots;
use crate::bot::{BotRecord, find_bot};
use crate::config::GlobalConfig;
use crate::constants::MEDIA_FETCH_TIMEOUT;
use crate::core::PostbotError;
use crate::grammar::{GrammarEngine, TemplateSource, TraceryEngine};
use crate::media::{MediaResolver, parse_directive};
use crate::publish::{HttpFetcher, HttpPublisher};
use crate::render::{ContentRenderer, preview};

#[derive(Args)]
pub struct RenderCommand {
    /// Bot id or name
    #[arg(required_unless_present = "file", conflicts_with = "file")]
    pub bot: Option<String>,

    /// Render a grammar JSON file instead of a stored bot (always offline)
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Seed the random choices for a reproducible result
    #[arg(long)]
    pub seed: Option<u64>,

    /// Do not fetch or upload media
    #[arg(long)]
    pub dry_run: bool,
}

impl RenderCommand {
    pub async fn execute(self, config: &GlobalConfig) -> Result<()> {
        let engine: Arc<dyn GrammarEngine> = Arc::new(match self.seed {
            Some(seed) => TraceryEngine::seeded(seed),
            None => TraceryEngine::new(),
        });

        let (source, bot) = match (&self.file, &self.bot) {
            (Some(path), _) => {
                let json = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("Failed to read grammar from {}", path.display()))?;
                (TemplateSource::from_json(&json)?, None)
            }
            (None, Some(query)) => {
                let bots = load_bots(config).await?;
                let bot = find_bot(&bots, query)?.clone();
                let source = bot.template().map_err(|e| PostbotError::InvalidScript {
                    bot: bot.id.clone(),
                    reason: e.to_string(),
                })?;
                (source, Some(bot))
            }
            (None, None) => {
                return Err(PostbotError::Other {
                    message: "Pass a bot name or --file".to_string(),
                }
                .into());
            }
        };

        match bot.filter(|_| !self.dry_run) {
            Some(bot) => render_online(engine, &source, &bot, config).await,
            None => render_offline(engine.as_ref(), &source),
        }
    }
}

fn render_offline(engine: &dyn GrammarEngine, source: &TemplateSource) -> Result<()> {
    let preview = preview(engine, source)?;
    println!("{}", preview.text);

    if !preview.directives.is_empty() {
        println!();
        println!("{} media directive(s):", preview.directives.len());
        for directive in &preview.directives {
            match parse_directive(&directive.raw) {
                Some(parsed) => println!("  {} {} {}", "•".cyan(), parsed.kind, parsed.url),
                None => println!(
                    "  {} {} {}",
                    "⚠".yellow(),
                    directive.raw,
                    "(ignored: prefix is not img or vid)".bright_black()
                ),
            }
        }
    }
    Ok(())
}

async fn render_online(
    engine: Arc<dyn GrammarEngine>,
    source: &TemplateSource,
    bot: &BotRecord,
    config: &GlobalConfig,
) -> Result<()> {
    let api_base = bot.credentials.api_base.as_deref().unwrap_or(&config.api_base);
    let publisher = Arc::new(HttpPublisher::new(api_base, bot.credentials.access_token.clone())?);
    let fetcher = Arc::new(HttpFetcher::new(MEDIA_FETCH_TIMEOUT)?);
    let renderer = ContentRenderer::new(engine, MediaResolver::new(fetcher, publisher))
        .with_concurrency(config.max_concurrent_fetches);

    let result = renderer.render(source).await?;
    println!("{}", result.text);
    if !result.media.is_empty() {
        println!();
        println!(
            "{} {}",
            "media:".cyan(),
            result.media.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
        );
    }
    Ok(())
}
