//! postbot CLI entry point
//!
//! Parses arguments, runs the selected command, and prints failures with
//! suggestions before exiting non-zero.

use anyhow::Result;
use clap::Parser;
use postbot::cli;
use postbot::core::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            user_friendly_error(e).display();
            std::process::exit(1);
        }
    }
}
