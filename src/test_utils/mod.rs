//! Test utilities for postbot
//!
//! In-memory doubles for every collaborator of the render pipeline and the
//! scheduler, plus logging setup for tests.
//!
//! The doubles cooperate: [`MockFetcher`] serves a PNG whose payload is the
//! requested URL, and [`MockUploader`] names each handle after that URL. A test
//! can therefore tell which directive produced which handle without caring in
//! which order uploads finished.
//!
//! # Example
//!
//! ```rust,no_run
//! use postbot::grammar::{TemplateSource, TraceryEngine};
//! use postbot::media::MediaResolver;
//! use postbot::render::ContentRenderer;
//! use postbot::test_utils::{MockFetcher, MockUploader};
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let renderer = ContentRenderer::new(
//!     Arc::new(TraceryEngine::seeded(1)),
//!     MediaResolver::new(Arc::new(MockFetcher::new()), Arc::new(MockUploader::new())),
//! );
//! let source = TemplateSource::from_rules([("origin", vec!["hi {img http://a/b.png}"])]);
//! let result = renderer.render(&source).await.unwrap();
//! assert_eq!(result.media[0].as_str(), "http://a/b.png");
//! # }
//! ```

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::bot::{BotRecord, BotStore, Credentials};
use crate::grammar::TraceryEngine;
use crate::media::{MediaError, MediaFetcher, MediaHandle, MediaResolver, MediaUploader};
use crate::publish::{PublishError, PublishReceipt, Publisher};
use crate::render::ContentRenderer;
use crate::scheduler::{BotSession, PostingBackend};

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// PNG file signature.
pub const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Initialize logging for tests.
///
/// Only the first call has an effect. With `level` set, logs at that level;
/// otherwise `RUST_LOG` decides, and without it nothing is logged.
///
/// ```bash
/// RUST_LOG=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

/// A PNG payload carrying `payload` after the signature.
#[must_use]
pub fn png_with_payload(payload: &str) -> Vec<u8> {
    let mut bytes = PNG_SIGNATURE.to_vec();
    bytes.extend_from_slice(payload.as_bytes());
    bytes
}

fn payload_of(bytes: &[u8]) -> Option<&str> {
    bytes.strip_prefix(PNG_SIGNATURE).and_then(|rest| std::str::from_utf8(rest).ok())
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// A bot with the given script, due immediately, posting every hour.
#[must_use]
pub fn bot_record(id: &str, script: &str) -> BotRecord {
    BotRecord {
        id: id.to_string(),
        name: id.to_string(),
        disabled: false,
        schedule: 3600,
        next_run: None,
        last_run: None,
        last_error: None,
        script: script.to_string(),
        credentials: Credentials {
            access_token: "test-token".to_string(),
            api_base: None,
        },
    }
}

/// Serves [`png_with_payload`]`(url)` for every URL unless told otherwise.
#[derive(Default)]
pub struct MockFetcher {
    bodies: HashMap<String, Vec<u8>>,
    failures: HashSet<String>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<String>>,
}

impl MockFetcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_body(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.insert(url.to_string(), body.into());
        self
    }

    /// Answer `url` with a 404.
    #[must_use]
    pub fn failing(mut self, url: &str) -> Self {
        self.failures.insert(url.to_string());
        self
    }

    /// Sleep before answering `url`.
    #[must_use]
    pub fn with_delay(mut self, url: &str, delay: Duration) -> Self {
        self.delays.insert(url.to_string(), delay);
        self
    }

    /// URLs requested so far, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl MediaFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, MediaError> {
        lock(&self.calls).push(url.to_string());
        if let Some(delay) = self.delays.get(url) {
            tokio::time::sleep(*delay).await;
        }
        if self.failures.contains(url) {
            return Err(MediaError::Fetch {
                url: url.to_string(),
                reason: "HTTP 404 Not Found".to_string(),
            });
        }
        Ok(self.bodies.get(url).cloned().unwrap_or_else(|| png_with_payload(url)))
    }
}

/// Names handles after the URL carried in the payload, or `upload-N` otherwise.
#[derive(Default)]
pub struct MockUploader {
    names: HashMap<String, String>,
    rejected: HashSet<String>,
    uploads: Mutex<Vec<String>>,
    counter: AtomicUsize,
}

impl MockUploader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `handle` for media fetched from `url`.
    #[must_use]
    pub fn with_handle(mut self, url: &str, handle: &str) -> Self {
        self.names.insert(url.to_string(), handle.to_string());
        self
    }

    /// Reject media fetched from `url`.
    #[must_use]
    pub fn rejecting(mut self, url: &str) -> Self {
        self.rejected.insert(url.to_string());
        self
    }

    /// MIME types of accepted and rejected uploads, in call order.
    #[must_use]
    pub fn uploads(&self) -> Vec<String> {
        lock(&self.uploads).clone()
    }
}

#[async_trait]
impl MediaUploader for MockUploader {
    async fn upload(&self, bytes: Vec<u8>, mime_type: &str) -> Result<MediaHandle, MediaError> {
        lock(&self.uploads).push(mime_type.to_string());
        let count = self.counter.fetch_add(1, Ordering::SeqCst) + 1;

        let Some(url) = payload_of(&bytes) else {
            return Ok(MediaHandle::new(format!("upload-{count}")));
        };
        if self.rejected.contains(url) {
            return Err(MediaError::Upload {
                reason: "HTTP 400: media rejected".to_string(),
            });
        }
        Ok(MediaHandle::new(self.names.get(url).map_or(url, String::as_str)))
    }
}

/// Records every post; optionally fails them all.
#[derive(Default)]
pub struct MockPublisher {
    posts: Mutex<Vec<(String, Vec<MediaHandle>)>>,
    failure: Option<PublishError>,
}

impl MockPublisher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn failing(error: PublishError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    /// Accepted posts as `(text, media)`.
    #[must_use]
    pub fn posts(&self) -> Vec<(String, Vec<MediaHandle>)> {
        lock(&self.posts).clone()
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    async fn publish(&self, text: &str, media: &[MediaHandle]) -> Result<PublishReceipt, PublishError> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        let mut posts = lock(&self.posts);
        posts.push((text.to_string(), media.to_vec()));
        Ok(PublishReceipt {
            id: format!("post-{}", posts.len()),
            text: text.to_string(),
        })
    }
}

/// Bot store held in memory.
#[derive(Default)]
pub struct MemoryStore {
    bots: Mutex<Vec<BotRecord>>,
    saves: AtomicUsize,
}

impl MemoryStore {
    #[must_use]
    pub fn new(bots: Vec<BotRecord>) -> Self {
        Self {
            bots: Mutex::new(bots),
            saves: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn bots(&self) -> Vec<BotRecord> {
        lock(&self.bots).clone()
    }

    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BotStore for MemoryStore {
    async fn load(&self) -> anyhow::Result<Vec<BotRecord>> {
        Ok(self.bots())
    }

    async fn save(&self, bots: &[BotRecord]) -> anyhow::Result<()> {
        *lock(&self.bots) = bots.to_vec();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Backend wiring every bot to the same mocks and a seeded grammar engine.
pub struct MockBackend {
    fetcher: Arc<MockFetcher>,
    uploader: Arc<MockUploader>,
    publisher: Arc<MockPublisher>,
    seed: u64,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::with_publisher(MockPublisher::new())
    }

    #[must_use]
    pub fn with_publisher(publisher: MockPublisher) -> Self {
        Self {
            fetcher: Arc::new(MockFetcher::new()),
            uploader: Arc::new(MockUploader::new()),
            publisher: Arc::new(publisher),
            seed: 0,
        }
    }

    #[must_use]
    pub fn with_media(mut self, fetcher: MockFetcher, uploader: MockUploader) -> Self {
        self.fetcher = Arc::new(fetcher);
        self.uploader = Arc::new(uploader);
        self
    }

    /// Seed for the grammar engine of every session.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn publisher(&self) -> &MockPublisher {
        &self.publisher
    }

    #[must_use]
    pub fn fetcher(&self) -> &MockFetcher {
        &self.fetcher
    }
}

#[async_trait]
impl PostingBackend for MockBackend {
    async fn session(&self, _bot: &BotRecord) -> anyhow::Result<BotSession> {
        Ok(BotSession {
            renderer: ContentRenderer::new(
                Arc::new(TraceryEngine::seeded(self.seed)),
                MediaResolver::new(self.fetcher.clone(), self.uploader.clone()),
            ),
            publisher: self.publisher.clone(),
        })
    }
}
