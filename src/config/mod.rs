//! Configuration management.
//!
//! - [`GlobalConfig`] - user-wide settings in `~/.postbot/config.toml`
//!
//! Per-bot settings (schedule, credentials, script) live in the bot store,
//! see [`crate::bot`]. Platform limits such as the media cap and fetch timeout
//! are fixed in [`crate::constants`].

mod global;

pub use global::GlobalConfig;
