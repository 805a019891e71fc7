//! Error handling for postbot
//!
//! The error system follows two rules:
//! 1. **Strongly-typed errors** for the parts of the program that branch on them
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! - [`PostbotError`] - application-level failures (configuration, store, bot lookup)
//! - [`ErrorContext`] - wrapper that adds details and a suggestion for display
//!
//! Pipeline errors live next to the code that produces them:
//! [`crate::grammar::GrammarError`], [`crate::media::MediaError`],
//! [`crate::publish::PublishError`] and [`crate::render::RenderError`].
//! [`user_friendly_error`] recognizes all of them.
//!
//! # Examples
//!
//! ```rust,no_run
//! use postbot::core::{PostbotError, user_friendly_error};
//!
//! let error = anyhow::Error::from(PostbotError::BotNotFound {
//!     name: "owl-bot".to_string(),
//!     suggestions: vec!["owl_bot".to_string()],
//! });
//! user_friendly_error(error).display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

use crate::grammar::GrammarError;
use crate::publish::PublishError;
use crate::render::RenderError;

/// The main error type for postbot operations
#[derive(Error, Debug)]
pub enum PostbotError {
    /// Configuration file could not be used
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// No bot in the store matches the requested name or id
    #[error("Bot '{name}' not found")]
    BotNotFound {
        /// Name or id that was requested
        name: String,
        /// Bots with similar names
        suggestions: Vec<String>,
    },

    /// The bot store could not be read or written
    ///
    /// # Fields
    /// - `path`: Location of the store file
    /// - `reason`: Underlying failure
    #[error("Bot store error at {path}: {reason}")]
    StoreError {
        /// Path to the store file
        path: String,
        /// Reason for the failure
        reason: String,
    },

    /// A bot's script is not a usable grammar
    #[error("Invalid script for bot '{bot}': {reason}")]
    InvalidScript {
        /// Bot whose script was rejected
        bot: String,
        /// Why it was rejected
        reason: String,
    },

    /// `validate` found problems
    #[error("Validation failed: {count} problem(s) found")]
    ValidationFailed {
        /// Number of problems reported
        count: usize,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerError(#[from] toml::ser::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Anything else
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
    },
}

/// An error with optional details and a suggestion for the user
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: PostbotError,
    /// What the user can do about it
    pub suggestion: Option<String>,
    /// Extra background on the failure
    pub details: Option<String>,
}

impl ErrorContext {
    #[must_use]
    pub const fn new(error: PostbotError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Append the `anyhow` cause chain to a message.
fn with_cause_chain(error: &anyhow::Error) -> String {
    let mut message = error.to_string();
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }
    message
}

/// Convert any error into an [`ErrorContext`] with a suggestion where one is known.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(grammar) = error.downcast_ref::<GrammarError>() {
        return grammar_error_context(grammar, with_cause_chain(&error));
    }

    if let Some(render) = error.downcast_ref::<RenderError>() {
        return match render {
            RenderError::Grammar(grammar) => grammar_error_context(grammar, with_cause_chain(&error)),
            RenderError::Publish(publish) => publish_error_context(publish, with_cause_chain(&error)),
        };
    }

    if let Some(publish) = error.downcast_ref::<PublishError>() {
        return publish_error_context(publish, with_cause_chain(&error));
    }

    let error = match error.downcast::<PostbotError>() {
        Ok(postbot_error) => return create_error_context(postbot_error),
        Err(error) => error,
    };

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(PostbotError::Other {
                    message: with_cause_chain(&error),
                })
                .with_suggestion("Check the ownership and permissions of the config and store files")
                .with_details("postbot could not read or write one of its files");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(PostbotError::Other {
                    message: with_cause_chain(&error),
                })
                .with_suggestion("Check that the file exists and the path is correct");
            }
            _ => {}
        }
    }

    if error.downcast_ref::<toml::de::Error>().is_some() {
        return ErrorContext::new(PostbotError::Other {
            message: with_cause_chain(&error),
        })
        .with_suggestion("Check the TOML syntax. Verify quotes, brackets, and that multi-line scripts use ''' strings")
        .with_details("TOML parsing errors are usually caused by missing quotes or mismatched brackets");
    }

    ErrorContext::new(PostbotError::Other {
        message: with_cause_chain(&error),
    })
}

fn grammar_error_context(error: &GrammarError, message: String) -> ErrorContext {
    let suggestion = match error {
        GrammarError::InvalidSource {
            ..
        } => "The script must be a JSON object such as {\"origin\": [\"Hello #name#\"], \"name\": [\"world\"]}",
        GrammarError::UnknownSymbol {
            ..
        } => "Define the symbol in the script or fix the reference; every script needs an \"origin\" symbol",
        GrammarError::Syntax {
            ..
        } => "Close every #tag# and [action]. Write a literal # as \\# and literal brackets as \\[ \\]",
        GrammarError::RecursionLimit {
            ..
        } => "A symbol expands into itself without end. Give recursive symbols a non-recursive rule",
    };
    ErrorContext::new(PostbotError::Other {
        message,
    })
    .with_suggestion(suggestion)
}

fn publish_error_context(error: &PublishError, message: String) -> ErrorContext {
    let context = ErrorContext::new(PostbotError::Other {
        message,
    });
    match error {
        PublishError::Rejected {
            status: 401 | 403,
            ..
        } => context
            .with_suggestion("Check the bot's access_token; it may have expired or lack write permission"),
        PublishError::Rejected {
            status: 429,
            ..
        } => context.with_suggestion("The service is rate limiting this account. Increase the bot's schedule"),
        PublishError::Rejected {
            ..
        } => context.with_details("The publishing service rejected the post"),
        PublishError::Transport {
            ..
        } => context.with_suggestion("Check your internet connection and the configured api_base"),
    }
}

fn create_error_context(error: PostbotError) -> ErrorContext {
    match &error {
        PostbotError::BotNotFound {
            suggestions,
            ..
        } => {
            let suggestion = if suggestions.is_empty() {
                "Run 'postbot list' to see the configured bots".to_string()
            } else {
                format!("Did you mean: {}?", suggestions.join(", "))
            };
            ErrorContext::new(error).with_suggestion(suggestion)
        }
        PostbotError::StoreError {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Check store_path in the config file and that the store is valid TOML with [[bots]] entries"),
        PostbotError::ConfigError {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Check the config file (default ~/.postbot/config.toml) or pass --config"),
        PostbotError::InvalidScript {
            ..
        } => ErrorContext::new(error).with_suggestion("Run 'postbot validate' for details on every bot script"),
        _ => ErrorContext::new(error),
    }
}
