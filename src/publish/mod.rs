//! Publishing client.
//!
//! [`Publisher`] is the final step of a post: text plus at most four media
//! handles go to the publishing service. [`HttpPublisher`] talks to an X/Twitter
//! v2 style HTTP API and also serves as the [`crate::media::MediaUploader`] for
//! the same account. [`HttpFetcher`] downloads directive URLs.

mod http;

pub use http::{HttpFetcher, HttpPublisher};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::media::MediaHandle;

/// Confirmation returned by the service for a published post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReceipt {
    /// Service-assigned post id
    pub id: String,
    /// Text as stored by the service
    pub text: String,
}

/// The service did not accept a post.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// The service answered with a non-success status
    #[error("publishing service rejected the post (HTTP {status}): {message}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Response body or reason phrase
        message: String,
    },

    /// The request never got a usable answer
    #[error("could not reach the publishing service: {reason}")]
    Transport {
        /// Underlying transport error
        reason: String,
    },
}

impl PublishError {
    /// Short machine-readable code recorded on the bot after a failed run.
    #[must_use]
    pub fn code(&self) -> String {
        match self {
            Self::Rejected {
                status,
                ..
            } => status.to_string(),
            Self::Transport {
                ..
            } => "transport".to_string(),
        }
    }

    /// Human-readable part of the error, without the code.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Rejected {
                message,
                ..
            } => message,
            Self::Transport {
                reason,
            } => reason,
        }
    }
}

/// Publishes composed posts.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish `text`, attaching `media` when it is non-empty.
    async fn publish(&self, text: &str, media: &[MediaHandle]) -> Result<PublishReceipt, PublishError>;
}
