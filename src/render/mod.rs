//! Content rendering: grammar expansion through to a publishable post.
//!
//! One render cycle:
//!
//! 1. Expand the template's `origin` symbol
//! 2. Scan the expanded text for media directives
//! 3. Resolve directives concurrently, keeping directive order
//! 4. Apply the per-post media cap
//! 5. Strip directive markup and restore escaped braces
//!
//! A grammar failure fails the render. Media failures only cost the post an
//! attachment and are logged here.
//!
//! ```rust,no_run
//! use postbot::grammar::{TemplateSource, TraceryEngine};
//! use postbot::media::MediaResolver;
//! use postbot::publish::{HttpFetcher, HttpPublisher};
//! use postbot::render::ContentRenderer;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let publisher = Arc::new(HttpPublisher::new("https://api.x.com", "token")?);
//! let fetcher = Arc::new(HttpFetcher::new(Duration::from_secs(5))?);
//! let renderer = ContentRenderer::new(
//!     Arc::new(TraceryEngine::new()),
//!     MediaResolver::new(fetcher, publisher.clone()),
//! );
//!
//! let source = TemplateSource::from_json(r#"{"origin": ["Good morning {img https://example.com/sun.png}"]}"#)?;
//! let receipt = renderer.post(&source, publisher.as_ref()).await?;
//! println!("posted {}", receipt.id);
//! # Ok(())
//! # }
//! ```

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::constants::{DEFAULT_MAX_CONCURRENT_FETCHES, MAX_MEDIA_PER_POST, START_SYMBOL};
use crate::grammar::{GrammarEngine, GrammarError, TemplateSource};
use crate::media::{
    Directive, MediaHandle, MediaResolver, cap_media, scan_directives, strip_directives,
    unescape_braces,
};
use crate::publish::{PublishError, PublishReceipt, Publisher};

/// Final text and media for one post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderResult {
    /// Post text with directives removed and escapes restored
    pub text: String,
    /// Uploaded media, at most [`MAX_MEDIA_PER_POST`]
    pub media: Vec<MediaHandle>,
}

/// An offline render: no media is fetched or uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    /// Text as it would be posted
    pub text: String,
    /// Directives that a real render would try to resolve
    pub directives: Vec<Directive>,
}

/// Why a render or post produced nothing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error(transparent)]
    Grammar(#[from] GrammarError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

impl RenderError {
    /// Short code recorded on the bot after a failed run.
    #[must_use]
    pub fn code(&self) -> String {
        match self {
            Self::Grammar(_) => "grammar".to_string(),
            Self::Publish(e) => e.code(),
        }
    }

    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Grammar(e) => e.to_string(),
            Self::Publish(e) => e.message().to_string(),
        }
    }
}

/// Expand `source` and strip its directives without resolving any media.
pub fn preview(engine: &dyn GrammarEngine, source: &TemplateSource) -> Result<Preview, GrammarError> {
    let expanded = engine.expand(source, START_SYMBOL)?;
    let directives = scan_directives(&expanded);
    Ok(Preview {
        text: unescape_braces(&strip_directives(&expanded)),
        directives,
    })
}

/// Drives one template through expansion, media resolution and cleanup.
#[derive(Clone)]
pub struct ContentRenderer {
    engine: Arc<dyn GrammarEngine>,
    resolver: MediaResolver,
    max_media: usize,
    concurrency: usize,
}

impl ContentRenderer {
    pub fn new(engine: Arc<dyn GrammarEngine>, resolver: MediaResolver) -> Self {
        Self {
            engine,
            resolver,
            max_media: MAX_MEDIA_PER_POST,
            concurrency: DEFAULT_MAX_CONCURRENT_FETCHES,
        }
    }

    /// Number of directives resolved at the same time (at least one).
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Lower the media cap. Values above the platform limit are clamped to it.
    #[must_use]
    pub fn with_max_media(mut self, max_media: usize) -> Self {
        self.max_media = max_media.min(MAX_MEDIA_PER_POST);
        self
    }

    /// Expand and clean up a template without touching the network.
    pub fn preview(&self, source: &TemplateSource) -> Result<Preview, GrammarError> {
        preview(self.engine.as_ref(), source)
    }

    /// Run a full render cycle.
    pub async fn render(&self, source: &TemplateSource) -> Result<RenderResult, GrammarError> {
        let expanded = self.engine.expand(source, START_SYMBOL)?;
        let directives = scan_directives(&expanded);
        debug!("Expanded template with {} media directive(s)", directives.len());

        let resolver = &self.resolver;
        let handles: Vec<MediaHandle> = stream::iter(directives.iter())
            .map(move |directive| async move {
                match resolver.resolve(&directive.raw).await {
                    Ok(Some(handle)) => {
                        debug!("Resolved {} to media {}", directive.raw, handle);
                        Some(handle)
                    }
                    Ok(None) => {
                        debug!("Ignoring {}: not a media directive", directive.raw);
                        None
                    }
                    Err(e) => {
                        warn!("Dropping media directive {}: {}", directive.raw, e);
                        None
                    }
                }
            })
            .buffered(self.concurrency)
            .filter_map(|handle| async move { handle })
            .collect()
            .await;

        let capped = cap_media(handles, self.max_media);
        if !capped.evicted.is_empty() {
            warn!(
                "Post has more than {} media attachments; dropping {}",
                self.max_media,
                capped.evicted.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
            );
        }

        Ok(RenderResult {
            text: unescape_braces(&strip_directives(&expanded)),
            media: capped.kept,
        })
    }

    /// Render, then publish the result.
    pub async fn post(
        &self,
        source: &TemplateSource,
        publisher: &dyn Publisher,
    ) -> Result<PublishReceipt, RenderError> {
        let rendered = self.render(source).await?;
        let receipt = publisher.publish(&rendered.text, &rendered.media).await?;
        info!("Published post {} with {} media attachment(s)", receipt.id, rendered.media.len());
        Ok(receipt)
    }
}

impl std::fmt::Debug for ContentRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentRenderer")
            .field("resolver", &self.resolver)
            .field("max_media", &self.max_media)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}
