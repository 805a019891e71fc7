//! reqwest-backed media fetching, uploading and publishing.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{PublishError, PublishReceipt, Publisher};
use crate::media::{MediaError, MediaFetcher, MediaHandle, MediaUploader};

fn user_agent() -> String {
    format!("postbot/{}", env!("CARGO_PKG_VERSION"))
}

/// Downloads directive URLs over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher whose client gives up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent())
            .build()
            .context("Failed to build HTTP client for media fetching")?;
        Ok(Self {
            client,
        })
    }
}

#[async_trait]
impl MediaFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, MediaError> {
        let fetch_error = |reason: String| MediaError::Fetch {
            url: url.to_string(),
            reason,
        };

        let response = self.client.get(url).send().await.map_err(|e| fetch_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(format!("HTTP {status}")));
        }

        let bytes = response.bytes().await.map_err(|e| fetch_error(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[derive(Debug, Deserialize)]
struct UploadData {
    id: String,
}

/// Upload response. Newer API versions return `data.id`; older ones `media_id_string`.
#[derive(Debug, Deserialize)]
struct UploadResponse {
    data: Option<UploadData>,
    media_id_string: Option<String>,
}

impl UploadResponse {
    fn into_handle(self) -> Option<MediaHandle> {
        self.data.map(|d| d.id).or(self.media_id_string).map(MediaHandle::new)
    }
}

#[derive(Debug, Serialize)]
struct PostMedia<'a> {
    media_ids: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
struct PostRequest<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    media: Option<PostMedia<'a>>,
}

impl<'a> PostRequest<'a> {
    fn new(text: &'a str, media: &'a [MediaHandle]) -> Self {
        let media = (!media.is_empty()).then(|| PostMedia {
            media_ids: media.iter().map(MediaHandle::as_str).collect(),
        });
        Self {
            text,
            media,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PostResponse {
    data: PublishReceipt,
}

/// Client for one bot account on the publishing service.
#[derive(Clone)]
pub struct HttpPublisher {
    client: reqwest::Client,
    api_base: String,
    access_token: String,
}

impl HttpPublisher {
    /// Surrounding whitespace is trimmed from both values.
    pub fn new(api_base: impl Into<String>, access_token: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent())
            .build()
            .context("Failed to build HTTP client for publishing")?;
        Ok(Self {
            client,
            api_base: api_base.into().trim().trim_end_matches('/').to_string(),
            access_token: access_token.into().trim().to_string(),
        })
    }

    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }
}

impl std::fmt::Debug for HttpPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPublisher")
            .field("api_base", &self.api_base)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl MediaUploader for HttpPublisher {
    async fn upload(&self, bytes: Vec<u8>, mime_type: &str) -> Result<MediaHandle, MediaError> {
        let upload_error = |reason: String| MediaError::Upload {
            reason,
        };

        let len = bytes.len();
        let part = Part::bytes(bytes)
            .file_name("media")
            .mime_str(mime_type)
            .map_err(|e| upload_error(e.to_string()))?;
        let form = Form::new().part("media", part);

        debug!("Uploading {} bytes of {}", len, mime_type);
        let response = self
            .client
            .post(self.endpoint("/2/media/upload"))
            .bearer_auth(&self.access_token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| upload_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(upload_error(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        let parsed: UploadResponse =
            response.json().await.map_err(|e| upload_error(format!("invalid upload response: {e}")))?;
        parsed.into_handle().ok_or_else(|| upload_error("upload response carried no media id".to_string()))
    }
}

#[async_trait]
impl Publisher for HttpPublisher {
    async fn publish(&self, text: &str, media: &[MediaHandle]) -> Result<PublishReceipt, PublishError> {
        let transport = |e: reqwest::Error| PublishError::Transport {
            reason: e.to_string(),
        };

        let response = self
            .client
            .post(self.endpoint("/2/tweets"))
            .bearer_auth(&self.access_token)
            .json(&PostRequest::new(text, media))
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = if body.is_empty() {
                status.canonical_reason().unwrap_or("unknown error").to_string()
            } else {
                body
            };
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: PostResponse = response.json().await.map_err(transport)?;
        Ok(parsed.data)
    }
}
