//! Record store abstraction
//!
//! [`RecordStore`] is what the manager and the retention engine consume. The
//! SQLite [`Database`] is the production implementation; see its methods for
//! the exact SQL semantics.

use crate::attachment::{Attachment, Progress};
use crate::content::Locator;
use crate::db::Database;
use crate::types::{AutoDelete, AutoDownload, Notification, NotificationId, Settings};
use crate::Result;
use async_trait::async_trait;

/// Durable notification storage
///
/// Attachment mutations are conditional on the stored progress code, which is
/// the per-notification serialization point. Methods returning `bool` report
/// whether the row actually changed.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a new notification; `false` if the ID already exists
    async fn insert(&self, notification: &Notification) -> Result<bool>;

    /// Point read by ID
    async fn get(&self, id: &NotificationId) -> Result<Option<Notification>>;

    /// All notifications, newest first
    async fn list(&self, include_deleted: bool) -> Result<Vec<Notification>>;

    /// Overwrite descriptive fields; attachment state is untouched
    async fn update(&self, notification: &Notification) -> Result<bool>;

    /// Compare-and-set the attachment state
    async fn transition_attachment(
        &self,
        id: &NotificationId,
        expected: Progress,
        next: &Attachment,
    ) -> Result<bool>;

    /// Monotonic progress write for a running transfer
    async fn update_progress(&self, id: &NotificationId, percent: u8) -> Result<bool>;

    /// Soft-delete one notification
    async fn mark_deleted(&self, id: &NotificationId) -> Result<bool>;

    /// Soft-deleted notifications that still hold content
    async fn query_deleted_with_attachment(&self) -> Result<Vec<Notification>>;

    /// Notifications older than `cutoff` that still hold content
    async fn query_with_attachment_older_than(&self, cutoff: i64) -> Result<Vec<Notification>>;

    /// Soft-delete everything older than `cutoff`
    async fn mark_deleted_older_than(&self, cutoff: i64) -> Result<u64>;

    /// Remove everything older than `cutoff` that no longer references content
    async fn remove_older_than(&self, cutoff: i64) -> Result<u64>;

    /// Notifications persisted as downloading
    async fn list_downloading(&self) -> Result<Vec<Notification>>;

    /// Every referenced content locator
    async fn content_uris(&self) -> Result<Vec<Locator>>;

    /// Seed settings that are not yet stored
    async fn seed_settings(&self, defaults: &Settings) -> Result<()>;

    /// Current soft-deletion policy
    async fn auto_delete(&self) -> Result<AutoDelete>;

    /// Change the soft-deletion policy
    async fn set_auto_delete(&self, policy: AutoDelete) -> Result<()>;

    /// Current automatic download policy
    async fn auto_download(&self) -> Result<AutoDownload>;

    /// Change the automatic download policy
    async fn set_auto_download(&self, policy: AutoDownload) -> Result<()>;
}

#[async_trait]
impl RecordStore for Database {
    async fn insert(&self, notification: &Notification) -> Result<bool> {
        self.insert_notification(notification).await
    }

    async fn get(&self, id: &NotificationId) -> Result<Option<Notification>> {
        self.get_notification(id).await
    }

    async fn list(&self, include_deleted: bool) -> Result<Vec<Notification>> {
        self.list_notifications(include_deleted).await
    }

    async fn update(&self, notification: &Notification) -> Result<bool> {
        self.update_notification(notification).await
    }

    async fn transition_attachment(
        &self,
        id: &NotificationId,
        expected: Progress,
        next: &Attachment,
    ) -> Result<bool> {
        Database::transition_attachment(self, id, expected, next).await
    }

    async fn update_progress(&self, id: &NotificationId, percent: u8) -> Result<bool> {
        Database::update_progress(self, id, percent).await
    }

    async fn mark_deleted(&self, id: &NotificationId) -> Result<bool> {
        Database::mark_deleted(self, id).await
    }

    async fn query_deleted_with_attachment(&self) -> Result<Vec<Notification>> {
        Database::query_deleted_with_attachment(self).await
    }

    async fn query_with_attachment_older_than(&self, cutoff: i64) -> Result<Vec<Notification>> {
        Database::query_with_attachment_older_than(self, cutoff).await
    }

    async fn mark_deleted_older_than(&self, cutoff: i64) -> Result<u64> {
        Database::mark_deleted_older_than(self, cutoff).await
    }

    async fn remove_older_than(&self, cutoff: i64) -> Result<u64> {
        Database::remove_older_than(self, cutoff).await
    }

    async fn list_downloading(&self) -> Result<Vec<Notification>> {
        Database::list_downloading(self).await
    }

    async fn content_uris(&self) -> Result<Vec<Locator>> {
        Database::content_uris(self).await
    }

    async fn seed_settings(&self, defaults: &Settings) -> Result<()> {
        Database::seed_settings(self, defaults).await
    }

    async fn auto_delete(&self) -> Result<AutoDelete> {
        Database::auto_delete(self).await
    }

    async fn set_auto_delete(&self, policy: AutoDelete) -> Result<()> {
        Database::set_auto_delete(self, policy).await
    }

    async fn auto_download(&self) -> Result<AutoDownload> {
        Database::auto_download(self).await
    }

    async fn set_auto_download(&self, policy: AutoDownload) -> Result<()> {
        Database::set_auto_download(self, policy).await
    }
}
