//! Per-download transfer task.
//!
//! One task runs per accepted [`AttachmentManager::enqueue`] call. It owns the
//! row while the row is downloading: it is the only writer of progress and of
//! the terminal `Done`/`Failed` state, and it always removes itself from the
//! active map before reporting its [`Outcome`].

use crate::attachment::{Attachment, Progress};
use crate::content::{InFlightGuard, Locator};
use crate::error::{DownloadError, Error};
use crate::types::{Event, NotificationId};
use futures::StreamExt;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::progress::{ProgressThrottle, Tick};
use super::{AttachmentManager, Outcome, unix_now};

/// Why a transfer did not produce content
enum Interrupted {
    Cancelled,
    Failed(Error),
}

impl From<Error> for Interrupted {
    fn from(e: Error) -> Self {
        Interrupted::Failed(e)
    }
}

impl From<DownloadError> for Interrupted {
    fn from(e: DownloadError) -> Self {
        Interrupted::Failed(e.into())
    }
}

/// Content written in full and committed
struct Stored {
    locator: Locator,
    bytes: u64,
    /// Keeps the content out of orphan cleanup until the row references it
    _owned: InFlightGuard,
}

impl AttachmentManager {
    /// Run one download to its terminal state
    pub(super) async fn run_download(
        self,
        id: NotificationId,
        started: Attachment,
        cancel: CancellationToken,
        outcome_tx: watch::Sender<Option<Outcome>>,
    ) {
        // Persisted progress, used as the compare-and-set token for the terminal write
        let mut persisted = started.progress;

        let outcome = match self.transfer(&id, &started, &cancel, &mut persisted).await {
            Ok(stored) => self.finish_completed(&id, &started, persisted, stored).await,
            Err(Interrupted::Cancelled) => {
                self.finish_failed(&id, &started, persisted).await;
                Outcome::Cancelled
            }
            Err(Interrupted::Failed(e)) => {
                tracing::warn!(notification_id = %id, error = %e, "Attachment download failed");
                self.finish_failed(&id, &started, persisted).await;
                self.emit_event(Event::DownloadFailed {
                    id: id.clone(),
                    error: e.to_string(),
                });
                Outcome::Failed
            }
        };

        self.downloads.active.lock().await.remove(&id);
        outcome_tx.send(Some(outcome)).ok();
    }

    /// Fetch the source into a new content entry
    ///
    /// Bytes are staged and only committed once the body has been read in
    /// full. Staged content is discarded before returning an error.
    async fn transfer(
        &self,
        id: &NotificationId,
        attachment: &Attachment,
        cancel: &CancellationToken,
        persisted: &mut Progress,
    ) -> Result<Stored, Interrupted> {
        if attachment.is_expired(unix_now()) {
            return Err(DownloadError::SourceExpired {
                id: id.to_string(),
                expires: attachment.expires.unwrap_or_default(),
            }
            .into());
        }

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Interrupted::Cancelled),
            response = self.fetcher.fetch(&attachment.url) => response.map_err(|e| {
                Error::from(DownloadError::Transfer {
                    id: id.to_string(),
                    reason: e.to_string(),
                })
            })?,
        };

        let mime_type = attachment
            .mime_type
            .as_deref()
            .or(response.mime_type.as_deref());
        let pending = self.content.open_write(&attachment.name, mime_type).await?;
        let locator = pending.locator;
        let owned = self.downloads.in_flight.track(locator.clone());
        let mut writer = pending.writer;
        let idle_timeout = self.config.download.idle_timeout;

        let total = attachment.size.or(response.content_length);
        let initial = match *persisted {
            Progress::Downloading { percent } => percent,
            _ => None,
        };
        let mut throttle =
            ProgressThrottle::new(self.config.download.progress_interval, total, initial);
        let mut stream = response.stream;
        let mut bytes: u64 = 0;

        let result: Result<(), Interrupted> = async {
            loop {
                let chunk = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(Interrupted::Cancelled),
                    chunk = tokio::time::timeout(idle_timeout, stream.next()) => chunk,
                };
                let Ok(chunk) = chunk else {
                    return Err(DownloadError::Transfer {
                        id: id.to_string(),
                        reason: format!("no data received for {:?}", idle_timeout),
                    }
                    .into());
                };
                let Some(chunk) = chunk else { break };

                let chunk = chunk.map_err(|e| {
                    Error::from(DownloadError::Transfer {
                        id: id.to_string(),
                        reason: e.to_string(),
                    })
                })?;
                writer.write_all(&chunk).await.map_err(Error::Io)?;
                bytes += chunk.len() as u64;

                match throttle.observe(bytes, Instant::now()) {
                    Some(Tick::Persist(percent)) => {
                        self.persist_progress(id, percent, persisted).await;
                        self.emit_event(Event::Downloading {
                            id: id.clone(),
                            percent: Some(percent),
                            bytes,
                        });
                    }
                    Some(Tick::Heartbeat) => {
                        self.emit_event(Event::Downloading {
                            id: id.clone(),
                            percent: None,
                            bytes,
                        });
                    }
                    None => {}
                }
            }

            writer.flush().await.map_err(Error::Io)?;
            writer.shutdown().await.map_err(Error::Io)?;
            Ok(())
        }
        .await;
        drop(writer);

        if let Err(interrupted) = result {
            self.discard_staged(id, &locator).await;
            return Err(interrupted);
        }

        // Fails when the staged bytes were removed underneath the transfer
        if let Err(e) = self.content.commit(&locator).await {
            self.discard_staged(id, &locator).await;
            return Err(e.into());
        }

        Ok(Stored {
            locator,
            bytes,
            _owned: owned,
        })
    }

    /// Write a progress report; a rejected write is not an error
    async fn persist_progress(&self, id: &NotificationId, percent: u8, persisted: &mut Progress) {
        match self.store.update_progress(id, percent).await {
            Ok(true) => {
                *persisted = Progress::Downloading {
                    percent: Some(percent),
                };
                tracing::debug!(notification_id = %id, percent, "Attachment progress");
            }
            Ok(false) => {
                tracing::debug!(notification_id = %id, percent, "Progress write skipped");
            }
            Err(e) => {
                tracing::error!(notification_id = %id, error = %e, "Failed to persist progress");
            }
        }
    }

    /// Attach the stored content and mark the row `Done`
    async fn finish_completed(
        &self,
        id: &NotificationId,
        started: &Attachment,
        persisted: Progress,
        stored: Stored,
    ) -> Outcome {
        let Stored {
            locator,
            bytes,
            _owned,
        } = stored;

        let done = match started.completed(locator.clone(), bytes) {
            Ok(done) => done,
            Err(e) => {
                tracing::error!(notification_id = %id, error = %e, "Cannot complete attachment");
                self.discard_content(id, &locator).await;
                return Outcome::Failed;
            }
        };

        match self.transition_from_downloading(id, persisted, &done).await {
            Ok(true) => {
                tracing::info!(notification_id = %id, bytes, locator = %locator, "Attachment downloaded");
                self.emit_event(Event::DownloadComplete {
                    id: id.clone(),
                    size: bytes,
                });
                Outcome::Completed
            }
            Ok(false) => {
                tracing::warn!(
                    notification_id = %id,
                    "Notification changed during download, discarding content"
                );
                self.discard_content(id, &locator).await;
                self.emit_event(Event::DownloadFailed {
                    id: id.clone(),
                    error: "notification changed during download".to_string(),
                });
                Outcome::Failed
            }
            Err(e) => {
                tracing::error!(notification_id = %id, error = %e, "Failed to persist completed download");
                self.discard_content(id, &locator).await;
                self.emit_event(Event::DownloadFailed {
                    id: id.clone(),
                    error: e.to_string(),
                });
                Outcome::Failed
            }
        }
    }

    /// Mark the row `Failed`
    async fn finish_failed(&self, id: &NotificationId, started: &Attachment, persisted: Progress) {
        let failed = match started.failed() {
            Ok(failed) => failed,
            Err(e) => {
                tracing::error!(notification_id = %id, error = %e, "Cannot fail attachment");
                return;
            }
        };

        match self.transition_from_downloading(id, persisted, &failed).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(notification_id = %id, "Attachment no longer downloading");
            }
            Err(e) => {
                tracing::error!(notification_id = %id, error = %e, "Failed to persist failed download");
            }
        }
    }

    /// Compare-and-set away from the downloading state
    ///
    /// A skipped progress write can leave `persisted` behind the stored value,
    /// so on a mismatch the row is re-read once and the write retried if it is
    /// still downloading.
    async fn transition_from_downloading(
        &self,
        id: &NotificationId,
        persisted: Progress,
        next: &Attachment,
    ) -> crate::Result<bool> {
        if self.store.transition_attachment(id, persisted, next).await? {
            return Ok(true);
        }

        let current = self
            .store
            .get(id)
            .await?
            .and_then(|n| n.attachment)
            .map(|a| a.progress);

        match current {
            Some(progress) if progress.is_downloading() && progress != persisted => {
                self.store.transition_attachment(id, progress, next).await
            }
            _ => Ok(false),
        }
    }

    /// Remove staged content that was never committed
    async fn discard_staged(&self, id: &NotificationId, locator: &Locator) {
        if let Err(e) = self.content.discard(locator).await {
            tracing::warn!(
                notification_id = %id,
                locator = %locator,
                error = %e,
                "Failed to remove partial content"
            );
        }
    }

    /// Remove committed content that will not be attached to any row
    async fn discard_content(&self, id: &NotificationId, locator: &Locator) {
        if let Err(e) = self.content.delete(locator).await {
            tracing::warn!(
                notification_id = %id,
                locator = %locator,
                error = %e,
                "Failed to remove unattached content"
            );
        }
    }
}
