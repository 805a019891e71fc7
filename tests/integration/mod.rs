//! Integration test suite for postbot
//!
//! End-to-end tests of the render pipeline, the scheduler against a real
//! store file, and the CLI binary. Nothing here touches the network; the
//! collaborators come from `postbot::test_utils`.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **render_pipeline**: grammar → directives → media → final text
//! - **scheduler**: ticks over a TOML store file
//! - **cli**: the `postbot` binary

// Shared test utilities (from parent tests/ directory)
#[path = "../common/mod.rs"]
mod common;

mod cli;
mod render_pipeline;
mod scheduler;
