//! Global constants used throughout the postbot codebase.
//!
//! This module contains timeout durations, platform limits, and other
//! numeric constants that are used across multiple modules. Defining
//! them centrally makes the platform contract easy to find.

use std::time::Duration;

/// Hard timeout for fetching a single media resource (5 seconds).
///
/// A fetch that has not completed by then is cancelled and the directive
/// contributes no media. It never affects other directives.
pub const MEDIA_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Maximum number of media attachments per published post.
///
/// This is a hard platform limit, not a preference.
pub const MAX_MEDIA_PER_POST: usize = 4;

/// Start symbol expanded for every post.
pub const START_SYMBOL: &str = "origin";

/// Length of the kind prefix in a media directive (`img` / `vid`).
pub const MEDIA_KIND_PREFIX_LEN: usize = 3;

/// Default interval between scheduler polls (15 minutes).
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 15 * 60;

/// Default number of directives resolved concurrently within one render.
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 4;

/// Maximum nesting depth for grammar expansion.
///
/// Self-referential grammars (`"a": ["#a#"]`) would otherwise recurse forever.
pub const MAX_EXPANSION_DEPTH: usize = 64;

/// Default API root for the publishing service.
pub const DEFAULT_API_BASE: &str = "https://api.x.com";

/// Message recorded on a bot whose script is not valid JSON grammar.
pub const SCRIPT_PARSE_ERROR_MESSAGE: &str =
    "Error parsing script. Please check the JSON source.";
