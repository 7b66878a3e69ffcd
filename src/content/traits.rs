//! Traits and types for attachment content storage

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tokio::io::{AsyncRead, AsyncWrite};

/// Opaque handle to stored content
///
/// Locators are produced by [`ContentStore::open_write`] and persisted as the
/// attachment's `content_uri`. Their format is private to the store.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locator(String);

impl Locator {
    /// Wrap a raw locator string
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Raw locator string, as persisted
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Write target for a new piece of content
///
/// Bytes are staged and only become visible under `locator` after
/// [`ContentStore::commit`]. An abandoned write is removed with
/// [`ContentStore::discard`].
pub struct PendingContent {
    /// Where the content will be found once committed
    pub locator: Locator,
    /// Byte sink
    pub writer: Box<dyn AsyncWrite + Send + Unpin>,
}

/// Readable stored content
pub struct ContentReader {
    /// Stored length in bytes
    pub size: u64,
    /// Byte source
    pub reader: Box<dyn AsyncRead + Send + Unpin>,
}

/// Listing entry used for orphan detection
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentEntry {
    /// Locator of the stored content
    pub locator: Locator,
    /// Last modification time
    pub modified: SystemTime,
    /// Staged and not yet committed
    pub pending: bool,
}

/// Trait for attachment content storage
///
/// Implementations must be safe to share between the download executor, the
/// retention engine and API handlers.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Whether content exists under `locator`
    ///
    /// Malformed locators report `false`.
    async fn exists(&self, locator: &Locator) -> bool;

    /// Open stored content for reading
    ///
    /// # Errors
    ///
    /// `StorageError::NotFound` when nothing is stored under `locator`.
    async fn open_read(&self, locator: &Locator) -> crate::Result<ContentReader>;

    /// Create a fresh write target for content named `name`
    ///
    /// Every call yields a distinct locator, even for identical names.
    async fn open_write(&self, name: &str, mime_type: Option<&str>)
    -> crate::Result<PendingContent>;

    /// Publish staged content under its locator
    ///
    /// # Errors
    ///
    /// `StorageError::NotFound` when nothing is staged under `locator`, for
    /// example because it was discarded in the meantime.
    async fn commit(&self, locator: &Locator) -> crate::Result<()>;

    /// Remove staged content that will never be committed
    ///
    /// Returns `false` when nothing was staged under `locator`.
    async fn discard(&self, locator: &Locator) -> crate::Result<bool>;

    /// Remove committed content
    ///
    /// Returns `false` when nothing was stored under `locator`.
    async fn delete(&self, locator: &Locator) -> crate::Result<bool>;

    /// Enumerate all committed and staged content
    async fn list(&self) -> crate::Result<Vec<ContentEntry>>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
