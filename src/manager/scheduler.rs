//! Download admission and cancellation.

use crate::attachment::{Attachment, Progress};
use crate::error::{DownloadError, Error, Result};
use crate::types::{AutoDownload, Event, NotificationId};
use std::sync::atomic::Ordering;
use tokio_util::sync::CancellationToken;

use super::{ActiveDownload, AttachmentManager, Outcome, unix_now};

impl AttachmentManager {
    /// Request a download of a notification's attachment
    ///
    /// `Ok(())` means the request was accepted and a download task is running.
    /// At most one task exists per notification: the active-download lock is
    /// held from the in-flight check until the new task is registered, so two
    /// concurrent calls cannot both be accepted.
    ///
    /// # Arguments
    ///
    /// * `id` - The notification whose attachment to fetch
    /// * `forced_by_user` - Explicit user request; bypasses the auto-download size policy
    ///
    /// # Errors
    ///
    /// - `AlreadyInFlight` if a task for `id` is running
    /// - `NotFound`, `NoAttachment`, `NotificationDeleted` for unusable notifications
    /// - `AlreadyDownloaded` if the content is present locally
    /// - `SourceExpired` if the source URL has expired; the attachment is marked `Failed`
    /// - `ThresholdExceeded` if an automatic request is declined by the size policy
    /// - `ShuttingDown` once shutdown has begun
    pub async fn enqueue(&self, id: &NotificationId, forced_by_user: bool) -> Result<()> {
        if !self.downloads.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let mut active = self.downloads.active.lock().await;
        if active.contains_key(id) {
            return Err(DownloadError::AlreadyInFlight { id: id.to_string() }.into());
        }

        let notification = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        if notification.deleted {
            return Err(DownloadError::NotificationDeleted { id: id.to_string() }.into());
        }
        let attachment = notification
            .attachment
            .ok_or_else(|| DownloadError::NoAttachment { id: id.to_string() })?;

        if attachment.progress == Progress::Done
            && let Some(locator) = &attachment.content_uri
            && self.content.exists(locator).await
        {
            return Err(DownloadError::AlreadyDownloaded { id: id.to_string() }.into());
        }

        let now = unix_now();
        if attachment.is_expired(now) {
            self.fail_expired(id, &attachment).await;
            return Err(DownloadError::SourceExpired {
                id: id.to_string(),
                expires: attachment.expires.unwrap_or_default(),
            }
            .into());
        }

        if !forced_by_user {
            let policy = self.store.auto_download().await?;
            if !policy.allows(attachment.size) {
                return Err(DownloadError::ThresholdExceeded {
                    id: id.to_string(),
                    reason: threshold_reason(policy, attachment.size),
                }
                .into());
            }
        }

        // No task is registered, so a persisted transfer is a leftover and may be restarted
        let base = if attachment.progress.is_downloading() {
            Progress::Failed
        } else {
            attachment.progress
        };
        let started_progress = base
            .start(false, attachment.size.is_some())
            .map_err(|source| DownloadError::InvalidTransition {
                id: id.to_string(),
                source,
            })?;
        let started = Attachment {
            progress: started_progress,
            content_uri: None,
            ..attachment.clone()
        };

        if !self
            .store
            .transition_attachment(id, attachment.progress, &started)
            .await?
        {
            return Err(DownloadError::Conflict { id: id.to_string() }.into());
        }

        let cancel = CancellationToken::new();
        let (outcome_tx, outcome_rx) = tokio::sync::watch::channel(None);
        active.insert(
            id.clone(),
            ActiveDownload {
                cancel: cancel.clone(),
                outcome: outcome_rx,
            },
        );
        drop(active);

        tracing::info!(
            notification_id = %id,
            forced_by_user,
            size = ?attachment.size,
            "Attachment download accepted"
        );
        self.emit_event(Event::DownloadStarted { id: id.clone() });

        let manager = self.clone();
        let id = id.clone();
        tokio::spawn(async move {
            manager.run_download(id, started, cancel, outcome_tx).await;
        });

        Ok(())
    }

    /// Cancel a running download
    ///
    /// No-op when no download is running for `id`. Otherwise signals the task
    /// and waits until it has removed its partial content and marked the
    /// attachment `Failed`, then emits `DownloadCancelled`. If the transfer
    /// finished before it observed the signal, the finished state stands.
    pub async fn cancel(&self, id: &NotificationId) -> Result<()> {
        let handle = {
            let active = self.downloads.active.lock().await;
            active
                .get(id)
                .map(|job| (job.cancel.clone(), job.outcome.clone()))
        };

        let Some((cancel, mut outcome)) = handle else {
            tracing::debug!(notification_id = %id, "Cancel requested with no active download");
            return Ok(());
        };

        cancel.cancel();
        let finished = outcome
            .wait_for(|o| o.is_some())
            .await
            .map(|o| *o)
            .unwrap_or(None);

        if finished == Some(Outcome::Cancelled) {
            tracing::info!(notification_id = %id, "Attachment download cancelled");
            self.emit_event(Event::DownloadCancelled { id: id.clone() });
        }

        Ok(())
    }

    /// Mark an attachment whose source expired as failed, without fetching
    async fn fail_expired(&self, id: &NotificationId, attachment: &Attachment) {
        let failed = match attachment.progress.expire() {
            Ok(progress) => Attachment {
                progress,
                content_uri: None,
                ..attachment.clone()
            },
            Err(e) => {
                tracing::warn!(notification_id = %id, error = %e, "Cannot mark expired attachment failed");
                return;
            }
        };

        match self
            .store
            .transition_attachment(id, attachment.progress, &failed)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(notification_id = %id, "Expired attachment changed concurrently");
            }
            Err(e) => {
                tracing::error!(notification_id = %id, error = %e, "Failed to persist expired attachment");
            }
        }

        tracing::info!(notification_id = %id, expires = ?attachment.expires, "Attachment source expired");
        self.emit_event(Event::DownloadFailed {
            id: id.clone(),
            error: "attachment link expired".to_string(),
        });
    }
}

fn threshold_reason(policy: AutoDownload, size: Option<u64>) -> String {
    match (policy, size) {
        (AutoDownload::Never, _) => "automatic downloads are disabled".to_string(),
        (_, None) => "attachment size is unknown".to_string(),
        (AutoDownload::UpTo { max_bytes }, Some(size)) => {
            format!("size {} exceeds limit {}", size, max_bytes)
        }
        (AutoDownload::Always, Some(_)) => "declined".to_string(),
    }
}
