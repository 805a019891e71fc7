//! Core error types for postbot.
//!
//! - [`PostbotError`] - application-level failures used by the CLI, store and config layers
//! - [`ErrorContext`] - user-facing wrapper with details and a suggestion
//! - [`user_friendly_error`] - turns any `anyhow::Error` into an [`ErrorContext`]
//!
//! ```rust
//! use postbot::core::{ErrorContext, PostbotError};
//!
//! let ctx = ErrorContext::new(PostbotError::ConfigError {
//!     message: "poll_interval_secs must be greater than zero".to_string(),
//! })
//! .with_suggestion("Set poll_interval_secs to 900 for a 15 minute poll");
//! assert!(ctx.to_string().contains("Suggestion: Set poll_interval_secs"));
//! ```

pub mod error;

pub use error::{ErrorContext, PostbotError, user_friendly_error};
