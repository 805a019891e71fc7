//! Media directives: scanning, resolution and the per-post cap.
//!
//! A rendered post may embed media directives such as
//! `{img https://example.com/cat.png}`. This module turns those directives into
//! opaque [`MediaHandle`]s the publishing service can attach to a post.
//!
//! # Pipeline
//!
//! 1. [`scan_directives`] finds directive spans in the expanded text
//! 2. [`MediaResolver`] fetches, sniffs and uploads each directive's resource
//! 3. [`cap_media`] limits the handles to the platform maximum
//!
//! Per-directive failures are values ([`MediaError`]), never panics or aborts:
//! a broken image URL costs the post one attachment, nothing more.
//!
//! # Collaborators
//!
//! Network access and type detection sit behind traits so the pipeline can run
//! against the real service ([`crate::publish::HttpPublisher`],
//! [`crate::publish::HttpFetcher`]) or against test doubles.

pub mod cap;
pub mod resolver;
pub mod scanner;
pub mod sniff;

pub use cap::{CappedMedia, cap_media};
pub use resolver::{MediaResolver, ParsedDirective, parse_directive};
pub use scanner::{Directive, scan_directives, strip_directives, unescape_braces};
pub use sniff::MagicSniffer;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Opaque identifier for an uploaded attachment.
///
/// Only meaningful to the service that issued it, and only for the current
/// render/publish cycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaHandle(String);

impl MediaHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MediaHandle {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Kind prefix of a directive.
///
/// Both kinds go through the same fetch/upload path; the distinction is kept
/// for callers that want to report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// `img` prefix
    Image,
    /// `vid` prefix
    Video,
}

impl MediaKind {
    /// Classify a 3-character directive prefix.
    #[must_use]
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "img" => Some(Self::Image),
            "vid" => Some(Self::Video),
            _ => None,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image => f.write_str("img"),
            Self::Video => f.write_str("vid"),
        }
    }
}

/// Failure while resolving one directive.
///
/// These never escape the render: the directive simply attaches nothing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    /// Network failure, timeout, or non-success status while fetching
    #[error("failed to fetch media from {url}: {reason}")]
    Fetch {
        /// URL that was requested
        url: String,
        /// What went wrong
        reason: String,
    },

    /// The payload did not match any known media signature
    #[error("could not detect media type ({len} bytes)")]
    TypeDetection {
        /// Size of the rejected payload
        len: usize,
    },

    /// The publishing service rejected the upload
    #[error("media upload failed: {reason}")]
    Upload {
        /// Status or transport error reported by the service
        reason: String,
    },
}

/// Retrieves the raw bytes behind a directive URL.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, MediaError>;
}

/// Detects a MIME type from raw bytes.
pub trait MediaSniffer: Send + Sync {
    fn detect(&self, bytes: &[u8]) -> Result<&'static str, MediaError>;
}

/// Accepts media for attachment and returns a handle for it.
#[async_trait]
pub trait MediaUploader: Send + Sync {
    async fn upload(&self, bytes: Vec<u8>, mime_type: &str) -> Result<MediaHandle, MediaError>;
}
