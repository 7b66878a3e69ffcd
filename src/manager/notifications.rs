//! Notification ingest, queries, deletion and settings.

use crate::attachment::{Attachment, AttachmentStatus, Progress};
use crate::content::ContentReader;
use crate::error::{DownloadError, Error, Result, StorageError};
use crate::types::{Event, NewNotification, Notification, NotificationId, Settings};

use super::{AttachmentManager, unix_now};

impl AttachmentManager {
    /// Store an incoming notification
    ///
    /// When the notification carries an attachment, an automatic download is
    /// attempted under the current auto-download policy; a declined or failed
    /// attempt does not fail the ingest.
    ///
    /// Re-ingesting an existing ID refreshes its descriptive fields and leaves
    /// the attachment state untouched.
    ///
    /// # Returns
    ///
    /// The ID of the stored notification (generated when none was supplied).
    pub async fn add_notification(&self, new: NewNotification) -> Result<NotificationId> {
        let notification = new.into_notification(unix_now());
        let id = notification.id.clone();

        if !self.store.insert(&notification).await? {
            let Some(existing) = self.store.get(&id).await? else {
                return Err(Error::NotFound(id.to_string()));
            };
            let refreshed = Notification {
                deleted: existing.deleted,
                attachment: existing.attachment,
                ..notification
            };
            self.store.update(&refreshed).await?;
            tracing::debug!(notification_id = %id, "Refreshed existing notification");
            return Ok(id);
        }

        tracing::info!(
            notification_id = %id,
            has_attachment = notification.attachment.is_some(),
            "Notification added"
        );
        self.emit_event(Event::NotificationAdded { id: id.clone() });

        if notification.attachment.is_some() {
            self.auto_download(&id).await;
        }

        Ok(id)
    }

    /// Attempt an automatic download, logging the outcome
    async fn auto_download(&self, id: &NotificationId) {
        match self.enqueue(id, false).await {
            Ok(()) => {}
            Err(Error::Download(DownloadError::ThresholdExceeded { reason, .. })) => {
                tracing::debug!(notification_id = %id, reason, "Attachment not auto-downloaded");
            }
            Err(Error::Download(DownloadError::SourceExpired { .. })) => {
                tracing::info!(notification_id = %id, "Attachment expired before auto-download");
            }
            Err(e) => {
                tracing::warn!(notification_id = %id, error = %e, "Auto-download not started");
            }
        }
    }

    /// Get a notification by ID
    ///
    /// Soft-deleted notifications are returned too; check [`Notification::deleted`].
    pub async fn get_notification(&self, id: &NotificationId) -> Result<Notification> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// List notifications, newest first
    pub async fn list_notifications(&self, include_deleted: bool) -> Result<Vec<Notification>> {
        self.store.list(include_deleted).await
    }

    /// Display status of a notification's attachment
    ///
    /// Completion is only claimed when the content actually exists in the
    /// content store.
    pub async fn attachment_status(&self, id: &NotificationId) -> Result<AttachmentStatus> {
        let attachment = self.require_attachment(id).await?;
        let exists = match &attachment.content_uri {
            Some(locator) => self.content.exists(locator).await,
            None => false,
        };
        Ok(attachment.status(exists, unix_now()))
    }

    /// Soft-delete a notification
    ///
    /// A running download is cancelled first. Its content, if any, is purged by
    /// the next retention sweep.
    pub async fn delete_notification(&self, id: &NotificationId) -> Result<()> {
        self.get_notification(id).await?;
        self.cancel(id).await?;

        if self.store.mark_deleted(id).await? {
            tracing::info!(notification_id = %id, "Notification deleted");
            self.emit_event(Event::NotificationDeleted { id: id.clone() });
        }

        Ok(())
    }

    /// Remove a downloaded attachment's content
    ///
    /// The attachment moves from `Done` to `Deleted`; any other state is
    /// rejected with `InvalidTransition` and a running download keeps going.
    ///
    /// # Errors
    ///
    /// A content store failure leaves the attachment `Done`.
    pub async fn delete_attachment(&self, id: &NotificationId) -> Result<()> {
        let attachment = self.require_attachment(id).await?;
        let purged = attachment
            .purged()
            .map_err(|source| DownloadError::InvalidTransition {
                id: id.to_string(),
                source,
            })?;

        if let Some(locator) = &attachment.content_uri
            && !self.content.delete(locator).await?
        {
            tracing::debug!(notification_id = %id, locator = %locator, "Content already gone");
        }

        if !self
            .store
            .transition_attachment(id, Progress::Done, &purged)
            .await?
        {
            return Err(DownloadError::Conflict { id: id.to_string() }.into());
        }

        tracing::info!(notification_id = %id, "Attachment content deleted");
        self.emit_event(Event::AttachmentDeleted { id: id.clone() });
        Ok(())
    }

    /// Open a downloaded attachment for reading
    ///
    /// # Errors
    ///
    /// `StorageError::NotFound` when the attachment is not downloaded or its
    /// content has gone missing.
    pub async fn open_content(&self, id: &NotificationId) -> Result<(Attachment, ContentReader)> {
        let attachment = self.require_attachment(id).await?;
        let locator = match (&attachment.progress, &attachment.content_uri) {
            (Progress::Done, Some(locator)) => locator.clone(),
            _ => {
                return Err(StorageError::NotFound(format!(
                    "attachment of notification {} is not downloaded",
                    id
                ))
                .into());
            }
        };

        let reader = self.content.open_read(&locator).await?;
        Ok((attachment, reader))
    }

    /// Current persisted settings
    pub async fn settings(&self) -> Result<Settings> {
        Ok(Settings {
            auto_delete: self.store.auto_delete().await?,
            auto_download: self.store.auto_download().await?,
        })
    }

    /// Replace the persisted settings
    ///
    /// Takes effect for the next enqueue and the next retention sweep.
    pub async fn update_settings(&self, settings: Settings) -> Result<()> {
        self.store.set_auto_delete(settings.auto_delete).await?;
        self.store.set_auto_download(settings.auto_download).await?;
        tracing::info!(?settings, "Settings updated");
        Ok(())
    }

    async fn require_attachment(&self, id: &NotificationId) -> Result<Attachment> {
        self.get_notification(id).await?.attachment.ok_or_else(|| {
            DownloadError::NoAttachment { id: id.to_string() }.into()
        })
    }
}
