//! Directive resolution: raw directive text → uploaded media handle.
//!
//! Resolution is single-shot and independent per directive. Every failure is
//! returned as a [`MediaError`] value; the resolver itself never logs and never
//! retries. Callers decide what a failure means (the renderer logs it and moves
//! on with one attachment fewer).

use std::sync::Arc;
use std::time::Duration;

use super::{
    MagicSniffer, MediaError, MediaFetcher, MediaHandle, MediaKind, MediaSniffer, MediaUploader,
    unescape_braces,
};
use crate::constants::{MEDIA_FETCH_TIMEOUT, MEDIA_KIND_PREFIX_LEN};

/// A directive that names a media resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDirective {
    pub kind: MediaKind,
    pub url: String,
}

/// Parse raw directive text (braces included).
///
/// Escaped braces inside the directive are restored, the outer braces are
/// removed, and the result is trimmed. The first three characters select the
/// kind; the character after them is a separator; the rest is the URL.
///
/// Returns `None` for directives whose prefix is not `img` or `vid`.
///
/// ```
/// use postbot::media::{MediaKind, parse_directive};
///
/// let parsed = parse_directive("{img https://example.com/a.png}").unwrap();
/// assert_eq!(parsed.kind, MediaKind::Image);
/// assert_eq!(parsed.url, "https://example.com/a.png");
///
/// assert!(parse_directive("{foo bar}").is_none());
/// ```
#[must_use]
pub fn parse_directive(raw: &str) -> Option<ParsedDirective> {
    let unescaped = unescape_braces(raw);

    let mut chars = unescaped.chars();
    chars.next();
    chars.next_back();
    let body = chars.as_str().trim();

    let prefix = body.get(..MEDIA_KIND_PREFIX_LEN)?;
    let kind = MediaKind::from_prefix(prefix)?;

    let mut rest = body[MEDIA_KIND_PREFIX_LEN..].chars();
    rest.next();
    Some(ParsedDirective {
        kind,
        url: rest.as_str().trim().to_string(),
    })
}

/// Turns directives into media handles via fetch → sniff → upload.
#[derive(Clone)]
pub struct MediaResolver {
    fetcher: Arc<dyn MediaFetcher>,
    sniffer: Arc<dyn MediaSniffer>,
    uploader: Arc<dyn MediaUploader>,
    fetch_timeout: Duration,
}

impl MediaResolver {
    /// Create a resolver using magic-byte sniffing and the standard fetch timeout.
    pub fn new(fetcher: Arc<dyn MediaFetcher>, uploader: Arc<dyn MediaUploader>) -> Self {
        Self {
            fetcher,
            sniffer: Arc::new(MagicSniffer),
            uploader,
            fetch_timeout: MEDIA_FETCH_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_sniffer(mut self, sniffer: Arc<dyn MediaSniffer>) -> Self {
        self.sniffer = sniffer;
        self
    }

    #[must_use]
    pub const fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    /// Resolve one raw directive.
    ///
    /// - `Ok(Some(handle))`: media was uploaded
    /// - `Ok(None)`: not a media directive (unknown prefix); nothing was fetched
    /// - `Err(_)`: fetch, type detection or upload failed
    pub async fn resolve(&self, raw: &str) -> Result<Option<MediaHandle>, MediaError> {
        let Some(directive) = parse_directive(raw) else {
            return Ok(None);
        };

        if directive.url.is_empty() {
            return Err(MediaError::Fetch {
                url: directive.url,
                reason: "directive has no URL".to_string(),
            });
        }

        let bytes = tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch(&directive.url))
            .await
            .map_err(|_| MediaError::Fetch {
                url: directive.url.clone(),
                reason: format!("timed out after {:?}", self.fetch_timeout),
            })??;

        let mime_type = self.sniffer.detect(&bytes)?;
        let handle = self.uploader.upload(bytes, mime_type).await?;
        Ok(Some(handle))
    }
}

impl std::fmt::Debug for MediaResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaResolver").field("fetch_timeout", &self.fetch_timeout).finish()
    }
}
