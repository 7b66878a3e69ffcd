//! Shared test helpers for creating AttachmentManager instances in tests.

use crate::config::Config;
use crate::content::FsContentStore;
use crate::db::Database;
use crate::error::Error;
use crate::fetch::{FetchResponse, Fetcher};
use crate::manager::AttachmentManager;
use crate::types::{NewAttachment, NewNotification, NotificationId};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::tempdir;
use tokio::sync::Semaphore;

/// In-memory fetcher serving fixed bodies
///
/// When gated, every chunk waits for a permit from [`TestFetcher::release`],
/// which lets tests hold a transfer open for as long as they need.
pub(crate) struct TestFetcher {
    bodies: std::sync::Mutex<HashMap<String, Vec<u8>>>,
    calls: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
    chunk_size: usize,
}

impl TestFetcher {
    /// Fetcher that streams immediately
    pub(crate) fn new() -> Self {
        Self {
            bodies: std::sync::Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
            gate: None,
            chunk_size: 1024,
        }
    }

    /// Fetcher whose chunks wait for [`TestFetcher::release`]
    pub(crate) fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::new()
        }
    }

    /// Serve `body` for `url`
    pub(crate) fn serve(&self, url: &str, body: Vec<u8>) {
        self.bodies.lock().unwrap().insert(url.to_string(), body);
    }

    /// Allow `chunks` more chunks through the gate
    pub(crate) fn release(&self, chunks: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(chunks);
        }
    }

    /// Number of fetches started
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for TestFetcher {
    async fn fetch(&self, url: &str) -> crate::Result<FetchResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let body = self.bodies.lock().unwrap().get(url).cloned();
        let Some(body) = body else {
            return Err(Error::Io(std::io::Error::other(format!(
                "HTTP error fetching attachment: 404 Not Found {}",
                url
            ))));
        };

        let content_length = Some(body.len() as u64);
        let chunks: Vec<Bytes> = body
            .chunks(self.chunk_size)
            .map(Bytes::copy_from_slice)
            .collect();
        let gate = self.gate.clone();
        let stream = futures::stream::iter(chunks).then(move |chunk| {
            let gate = gate.clone();
            async move {
                if let Some(gate) = gate
                    && let Ok(permit) = gate.acquire().await
                {
                    permit.forget();
                }
                Ok::<_, std::io::Error>(chunk)
            }
        });

        Ok(FetchResponse {
            content_length,
            mime_type: None,
            stream: Box::pin(stream),
        })
    }
}

/// Test configuration rooted in `dir`
pub(crate) fn test_config(dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.persistence.database_path = dir.join("test.db");
    config.content.content_dir = dir.join("attachments");
    config.download.progress_interval = Duration::from_millis(10);
    config
}

/// Helper to create a test AttachmentManager with an immediate in-memory fetcher.
/// Returns the manager and the tempdir (which must be kept alive).
pub(crate) async fn create_test_manager() -> (AttachmentManager, tempfile::TempDir) {
    let (manager, temp_dir, _fetcher) = create_test_manager_with(TestFetcher::new()).await;
    (manager, temp_dir)
}

/// Helper to create a test AttachmentManager around a given fetcher
pub(crate) async fn create_test_manager_with(
    fetcher: TestFetcher,
) -> (AttachmentManager, tempfile::TempDir, Arc<TestFetcher>) {
    let temp_dir = tempdir().unwrap();
    let config = test_config(temp_dir.path());
    let (manager, fetcher) = open_manager(config, Arc::new(fetcher)).await;
    (manager, temp_dir, fetcher)
}

/// Build a manager over real storage in the configured locations
pub(crate) async fn open_manager(
    config: Config,
    fetcher: Arc<TestFetcher>,
) -> (AttachmentManager, Arc<TestFetcher>) {
    let db = Database::new(&config.persistence.database_path)
        .await
        .unwrap();
    let content = FsContentStore::new(&config.content.content_dir)
        .await
        .unwrap();
    let manager = AttachmentManager::with_parts(
        config,
        Arc::new(db),
        Arc::new(content),
        fetcher.clone(),
    )
    .await
    .unwrap();
    (manager, fetcher)
}

/// Incoming notification with an attachment at `url`
pub(crate) fn notification_with_attachment(
    id: &str,
    url: &str,
    size: Option<u64>,
) -> NewNotification {
    NewNotification {
        id: Some(NotificationId::new(id)),
        title: "Backup finished".to_string(),
        message: format!("see attachment {}", id),
        attachment: Some(NewAttachment {
            url: url.to_string(),
            size,
            ..NewAttachment::default()
        }),
        ..NewNotification::default()
    }
}

/// Wait until no download task is running for `id`
pub(crate) async fn wait_until_idle(manager: &AttachmentManager, id: &NotificationId) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while manager.is_downloading(id).await {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("download should finish");
}
