//! Command-line interface for postbot.
//!
//! # Commands
//!
//! - `run` - poll the bot store and post whenever a bot is due (`--once` for a single tick)
//! - `post <bot>` - post for one bot right now
//! - `render <bot>` / `render --file <grammar.json>` - show what a bot would post
//! - `validate` - check every bot script and the store
//! - `list` - show configured bots and their schedule
//!
//! # Global options
//!
//! - `--verbose` / `-v` - debug logging
//! - `--quiet` / `-q` - errors only
//! - `--config <path>` / `-c` - config file (also `POSTBOT_CONFIG`)
//!
//! `RUST_LOG` takes precedence over both verbosity flags.
//!
//! ```bash
//! postbot --config ./dev.toml list
//! postbot render owl-facts --seed 42
//! postbot -v run --once
//! ```

mod common;
pub mod list;
pub mod post;
pub mod render;
pub mod run;
pub mod validate;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::GlobalConfig;

/// Output format for commands that can emit machine-readable results.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text with colors
    Text,
    /// Pretty-printed JSON
    Json,
}

/// Top-level command line.
#[derive(Parser)]
#[command(
    name = "postbot",
    about = "Scheduled social-media posting bot driven by Tracery grammars",
    version,
    long_about = "postbot expands Tracery-style grammars into posts, uploads the media they reference with {img URL} / {vid URL} directives, and publishes them on each bot's schedule."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the config file [default: ~/.postbot/config.toml]
    #[arg(short, long, global = true, env = "POSTBOT_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scheduler
    Run(run::RunCommand),

    /// Post for one bot immediately
    Post(post::PostCommand),

    /// Render a bot's grammar without publishing
    Render(render::RenderCommand),

    /// Check bot scripts and the store for problems
    Validate(validate::ValidateCommand),

    /// List configured bots
    List(list::ListCommand),
}

impl Cli {
    /// Set up logging, load the configuration and run the selected command.
    pub async fn execute(self) -> Result<()> {
        init_logging(self.verbose, self.quiet);

        let config = GlobalConfig::load_with_optional(self.config.clone()).await?;
        match self.command {
            Commands::Run(cmd) => cmd.execute(&config).await,
            Commands::Post(cmd) => cmd.execute(&config).await,
            Commands::Render(cmd) => cmd.execute(&config).await,
            Commands::Validate(cmd) => cmd.execute(&config).await,
            Commands::List(cmd) => cmd.execute(&config).await,
        }
    }
}

/// Log filter for the given verbosity flags when `RUST_LOG` is unset.
#[must_use]
pub const fn default_log_level(verbose: bool, quiet: bool) -> &'static str {
    if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "info"
    }
}

/// Install the global tracing subscriber, writing to stderr.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging(verbose: bool, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_level(verbose, quiet)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from(["postbot", "list", "--verbose", "--config", "/tmp/c.toml"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        assert!(matches!(cli.command, Commands::List(_)));
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["postbot", "-v", "-q", "list"]).is_err());
    }

    #[test]
    fn test_default_log_level() {
        assert_eq!(default_log_level(true, false), "debug");
        assert_eq!(default_log_level(false, true), "error");
        assert_eq!(default_log_level(false, false), "info");
    }
}
