//! postbot - scheduled social-media posting bot
//!
//! postbot periodically loads bot records from a store, expands each bot's
//! Tracery-style grammar into a post, uploads the media the post references,
//! and publishes it.
//!
//! # Pipeline
//!
//! ```text
//! grammar ──expand──▶ text ──scan──▶ directives ──resolve──▶ handles ──cap──▶ ≤ 4 handles
//!                      │                                                        │
//!                      └──────────── strip + unescape ──▶ final text ───────────┴──▶ publish
//! ```
//!
//! A post embeds media with directives such as `{img https://example.com/owl.png}`
//! or `{vid https://example.com/clip.mp4}`. Literal braces are written `\{` and
//! `\}`. A directive whose media cannot be fetched, recognized or uploaded is
//! dropped; the rest of the post still goes out.
//!
//! # Modules
//!
//! ## Core pipeline
//! - [`grammar`] - grammar sources and Tracery expansion
//! - [`media`] - directive scanning, media resolution and the per-post cap
//! - [`render`] - the render cycle tying the above together
//!
//! ## Around the pipeline
//! - [`publish`] - HTTP media upload and publishing
//! - [`bot`] - bot records and the TOML bot store
//! - [`scheduler`] - the poll loop
//! - [`cli`] - command-line interface
//! - [`config`] - global configuration (`~/.postbot/config.toml`)
//! - [`core`] - error types and user-facing error reporting
//! - [`constants`] - platform limits and defaults
//!
//! # Example
//!
//! ```bash
//! # Preview a bot's next post without fetching anything
//! postbot render owl-facts --dry-run --seed 7
//!
//! # Check every bot script
//! postbot validate
//!
//! # Run the scheduler
//! postbot run
//! ```

// Core pipeline
pub mod grammar;
pub mod media;
pub mod render;

// Collaborators
pub mod bot;
pub mod publish;
pub mod scheduler;

// Application
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
