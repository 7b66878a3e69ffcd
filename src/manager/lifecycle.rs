//! Startup recovery and shutdown coordination.

use crate::error::Result;
use crate::types::Event;
use std::sync::atomic::Ordering;

use super::AttachmentManager;

impl AttachmentManager {
    /// Fail every attachment persisted as downloading
    ///
    /// Called once at construction. No download task survives a process
    /// restart, so such rows would otherwise stay "downloading" forever. Partial
    /// bytes from the previous process are left to orphan cleanup.
    pub(crate) async fn recover_interrupted(&self) -> Result<u64> {
        let stale = self.store.list_downloading().await?;
        let mut recovered = 0;

        for notification in stale {
            let Some(attachment) = notification.attachment else {
                continue;
            };
            let failed = match attachment.failed() {
                Ok(failed) => failed,
                Err(e) => {
                    tracing::warn!(notification_id = %notification.id, error = %e, "Skipping interrupted attachment");
                    continue;
                }
            };

            if self
                .store
                .transition_attachment(&notification.id, attachment.progress, &failed)
                .await?
            {
                recovered += 1;
                tracing::info!(
                    notification_id = %notification.id,
                    "Marked interrupted download as failed"
                );
            }
        }

        if recovered > 0 {
            tracing::info!(recovered, "Recovered interrupted downloads");
        }

        Ok(recovered)
    }

    /// Gracefully shut down the manager
    ///
    /// This method performs a graceful shutdown sequence:
    /// 1. Stops accepting new downloads (`enqueue` returns `ShuttingDown`) and
    ///    stops background services
    /// 2. Cancels all active downloads
    /// 3. Waits for them to persist their terminal state, up to 30 seconds
    /// 4. Emits [`Event::Shutdown`]
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        self.downloads.accepting_new.store(false, Ordering::SeqCst);
        self.downloads.shutdown.cancel();
        tracing::info!("Stopped accepting new downloads");

        let cancelled = self.cancel_all().await;
        tracing::info!(cancelled, "Signaled cancellation to all active downloads");

        let shutdown_timeout = std::time::Duration::from_secs(30);
        match tokio::time::timeout(shutdown_timeout, self.wait_for_active_downloads()).await {
            Ok(()) => tracing::info!("All active downloads stopped"),
            Err(_) => tracing::warn!(
                "Timeout waiting for downloads to stop, proceeding with shutdown"
            ),
        }

        self.emit_event(Event::Shutdown);

        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    /// Signal cancellation to every active download
    async fn cancel_all(&self) -> usize {
        let active = self.downloads.active.lock().await;
        for (id, job) in active.iter() {
            tracing::debug!(notification_id = %id, "Signaling cancellation");
            job.cancel.cancel();
        }
        active.len()
    }

    /// Wait until the active download map is empty
    async fn wait_for_active_downloads(&self) {
        loop {
            let active_count = self.downloads.active.lock().await.len();
            if active_count == 0 {
                return;
            }

            tracing::debug!(active_count, "Waiting for active downloads to stop");
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
    }
}
