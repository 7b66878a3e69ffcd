//! Attachment lifecycle manager split into focused submodules.
//!
//! The `AttachmentManager` struct and its methods are organized by domain:
//! - [`scheduler`] - Single-flight admission (`enqueue`) and cancellation
//! - [`executor`] - Per-download transfer task
//! - [`progress`] - Progress persistence throttling
//! - [`notifications`] - Notification ingest, queries and deletion
//! - [`lifecycle`] - Restart recovery and shutdown coordination
//! - [`services`] - Background service starters

mod executor;
mod lifecycle;
mod notifications;
mod progress;
mod scheduler;
mod services;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::config::Config;
use crate::content::{ContentStore, FsContentStore, InFlightContent};
use crate::db::Database;
use crate::error::Result;
use crate::fetch::{Fetcher, HttpFetcher};
use crate::store::RecordStore;
use crate::types::{NotificationId, Settings};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tokio_util::sync::CancellationToken;

/// How a download task ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// Content stored, row is `Done`
    Completed,
    /// Transfer or persistence error, row is `Failed`
    Failed,
    /// Cancelled before completion, row is `Failed`
    Cancelled,
}

/// Handle to a running download task
pub(crate) struct ActiveDownload {
    /// Signals the task to stop at the next chunk boundary
    pub(crate) cancel: CancellationToken,
    /// Resolves once the task has persisted its terminal state
    pub(crate) outcome: tokio::sync::watch::Receiver<Option<Outcome>>,
}

/// Active download tracking
#[derive(Clone)]
pub(crate) struct DownloadState {
    /// Running downloads keyed by notification; the lock is held for the whole admission check
    pub(crate) active: Arc<tokio::sync::Mutex<HashMap<NotificationId, ActiveDownload>>>,
    /// Flag to indicate whether new downloads are accepted (set to false during shutdown)
    pub(crate) accepting_new: Arc<AtomicBool>,
    /// Cancelled once shutdown begins; stops background services
    pub(crate) shutdown: CancellationToken,
    /// Staged content owned by running tasks, protected from orphan cleanup
    pub(crate) in_flight: InFlightContent,
}

impl DownloadState {
    fn new() -> Self {
        Self {
            active: Arc::new(tokio::sync::Mutex::new(HashMap::new())),
            accepting_new: Arc::new(AtomicBool::new(true)),
            shutdown: CancellationToken::new(),
            in_flight: InFlightContent::new(),
        }
    }
}

/// Main manager instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct AttachmentManager {
    /// Notification persistence
    pub(crate) store: Arc<dyn RecordStore>,
    /// Attachment bytes
    pub(crate) content: Arc<dyn ContentStore>,
    /// Source retrieval
    pub(crate) fetcher: Arc<dyn Fetcher>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<crate::types::Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Active download tracking
    pub(crate) downloads: DownloadState,
}

impl AttachmentManager {
    /// Create a new AttachmentManager instance
    ///
    /// This initializes all core components:
    /// - Opens/creates the SQLite database and runs migrations
    /// - Opens/creates the content directory
    /// - Builds the HTTP fetcher
    /// - Seeds settings and recovers downloads interrupted by a previous process
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let db = Database::new(&config.persistence.database_path).await?;
        let content = FsContentStore::new(&config.content.content_dir).await?;
        let fetcher = HttpFetcher::new(&config.download)?;

        tracing::info!(
            database = %config.persistence.database_path.display(),
            content_dir = %config.content.content_dir.display(),
            "Attachment manager storage initialized"
        );

        Self::with_parts(config, Arc::new(db), Arc::new(content), Arc::new(fetcher)).await
    }

    /// Create a manager from explicit components
    ///
    /// Used to plug in alternative stores or fetchers. Performs the same
    /// settings seeding and restart recovery as [`AttachmentManager::new`].
    pub async fn with_parts(
        config: Config,
        store: Arc<dyn RecordStore>,
        content: Arc<dyn ContentStore>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self> {
        store
            .seed_settings(&Settings {
                auto_delete: config.retention.auto_delete,
                auto_download: config.download.auto_download,
            })
            .await?;

        // Create broadcast channel with buffer size of 1000 events
        let (event_tx, _rx) = tokio::sync::broadcast::channel(1000);

        tracing::info!(content_store = content.name(), "Attachment manager initialized");

        let manager = Self {
            store,
            content,
            fetcher,
            event_tx,
            config: Arc::new(config),
            downloads: DownloadState::new(),
        };

        // No download task survives a restart, so any persisted transfer is stale
        manager.recover_interrupted().await?;

        Ok(manager)
    }

    /// Subscribe to lifecycle events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events independently.
    /// Events are buffered, but if a subscriber falls behind by more than 1000 events,
    /// it will receive a `RecvError::Lagged` error.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use alertbox::{AttachmentManager, Config};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let manager = AttachmentManager::new(Config::default()).await?;
    ///
    ///     let mut events = manager.subscribe();
    ///     tokio::spawn(async move {
    ///         while let Ok(event) = events.recv().await {
    ///             tracing::info!(?event, "attachment event");
    ///         }
    ///     });
    ///
    ///     Ok(())
    /// }
    /// ```
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<crate::types::Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers, the event is silently dropped.
    pub(crate) fn emit_event(&self, event: crate::types::Event) {
        // send() returns Err if there are no receivers, which is fine - we just drop the event
        self.event_tx.send(event).ok();
    }

    /// Whether a download task is running for `id`
    pub async fn is_downloading(&self, id: &NotificationId) -> bool {
        self.downloads.active.lock().await.contains_key(id)
    }

    /// Spawn the REST API server in a background task
    ///
    /// The server listens on the configured bind address (default: 127.0.0.1:6790).
    pub fn spawn_api_server(self: &Arc<Self>) -> tokio::task::JoinHandle<Result<()>> {
        let manager = self.clone();
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(manager, config).await })
    }
}

/// Current unix time in seconds
pub(crate) fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}
