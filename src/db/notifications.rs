//! Notification CRUD, attachment transitions and retention queries.
//!
//! Every attachment mutation is a single `UPDATE ... WHERE id = ? AND
//! attachment_progress = ?`. The progress code is the compare-and-set token,
//! so a writer holding a stale view of the row changes nothing and learns so
//! from the `bool` result.

use crate::attachment::{Attachment, MAX_DOWNLOADING_PERCENT, Progress, progress_code};
use crate::content::Locator;
use crate::error::DatabaseError;
use crate::types::{Notification, NotificationId};
use crate::{Error, Result};

use super::{Database, NOTIFICATION_COLUMNS, NotificationRow};

/// SQL predicate matching rows with a running transfer
const DOWNLOADING_PREDICATE: &str =
    "(attachment_progress = -2 OR attachment_progress BETWEEN 0 AND 99)";

fn query_failed(context: &str, e: sqlx::Error) -> Error {
    Error::Database(DatabaseError::QueryFailed(format!("{}: {}", context, e)))
}

impl Database {
    /// Insert a new notification
    ///
    /// Returns `false` (and changes nothing) if the ID already exists.
    pub async fn insert_notification(&self, notification: &Notification) -> Result<bool> {
        let tags = serde_json::to_string(&notification.tags)?;
        let attachment = notification.attachment.as_ref();

        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO notifications (
                id, timestamp, title, message, tags, priority, click, deleted,
                attachment_name, attachment_url, attachment_mime_type, attachment_size,
                attachment_expires, attachment_content_uri, attachment_progress
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&notification.id)
        .bind(notification.timestamp)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(tags)
        .bind(notification.priority.to_i32())
        .bind(&notification.click)
        .bind(notification.deleted as i32)
        .bind(attachment.map(|a| a.name.as_str()))
        .bind(attachment.map(|a| a.url.as_str()))
        .bind(attachment.and_then(|a| a.mime_type.as_deref()))
        .bind(attachment.and_then(|a| a.size).map(size_to_i64))
        .bind(attachment.and_then(|a| a.expires))
        .bind(attachment.and_then(|a| a.content_uri.as_ref().map(Locator::as_str)))
        .bind(
            attachment
                .map(|a| a.progress)
                .unwrap_or(Progress::None)
                .to_code(),
        )
        .execute(&self.pool)
        .await
        .map_err(|e| query_failed("Failed to insert notification", e))?;

        Ok(result.rows_affected() == 1)
    }

    /// Get a notification by ID
    pub async fn get_notification(&self, id: &NotificationId) -> Result<Option<Notification>> {
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            "SELECT {} FROM notifications WHERE id = ?",
            NOTIFICATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| query_failed("Failed to get notification", e))?;

        Ok(row.map(Notification::from))
    }

    /// List notifications, newest first
    pub async fn list_notifications(&self, include_deleted: bool) -> Result<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            "SELECT {} FROM notifications WHERE deleted = 0 OR ? ORDER BY timestamp DESC, id ASC",
            NOTIFICATION_COLUMNS
        ))
        .bind(include_deleted)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| query_failed("Failed to list notifications", e))?;

        Ok(rows.into_iter().map(Notification::from).collect())
    }

    /// Overwrite the descriptive fields of a notification
    ///
    /// Attachment columns are left alone; those only change through
    /// [`Database::transition_attachment`] and [`Database::update_progress`].
    pub async fn update_notification(&self, notification: &Notification) -> Result<bool> {
        let tags = serde_json::to_string(&notification.tags)?;

        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET timestamp = ?, title = ?, message = ?, tags = ?, priority = ?,
                click = ?, deleted = ?
            WHERE id = ?
            "#,
        )
        .bind(notification.timestamp)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(tags)
        .bind(notification.priority.to_i32())
        .bind(&notification.click)
        .bind(notification.deleted as i32)
        .bind(&notification.id)
        .execute(&self.pool)
        .await
        .map_err(|e| query_failed("Failed to update notification", e))?;

        Ok(result.rows_affected() == 1)
    }

    /// Conditionally replace the attachment state of a notification
    ///
    /// Writes `next.progress`, `next.content_uri` and `next.size` only if the
    /// stored progress still equals `expected`. Returns whether the row changed.
    pub async fn transition_attachment(
        &self,
        id: &NotificationId,
        expected: Progress,
        next: &Attachment,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET attachment_progress = ?, attachment_content_uri = ?, attachment_size = ?
            WHERE id = ? AND attachment_url IS NOT NULL AND attachment_progress = ?
            "#,
        )
        .bind(next.progress.to_code())
        .bind(next.content_uri.as_ref().map(Locator::as_str))
        .bind(next.size.map(size_to_i64))
        .bind(id)
        .bind(expected.to_code())
        .execute(&self.pool)
        .await
        .map_err(|e| query_failed("Failed to transition attachment", e))?;

        Ok(result.rows_affected() == 1)
    }

    /// Persist a progress report for a running transfer
    ///
    /// Only applies while the row is downloading and never moves the percentage
    /// backwards (an indeterminate row may become determinate). Returns whether
    /// the row changed.
    pub async fn update_progress(&self, id: &NotificationId, percent: u8) -> Result<bool> {
        if percent > MAX_DOWNLOADING_PERCENT {
            return Ok(false);
        }

        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET attachment_progress = ?
            WHERE id = ?
              AND (attachment_progress = ?
                   OR (attachment_progress BETWEEN 0 AND 99 AND attachment_progress < ?))
            "#,
        )
        .bind(percent as i32)
        .bind(id)
        .bind(progress_code::INDETERMINATE)
        .bind(percent as i32)
        .execute(&self.pool)
        .await
        .map_err(|e| query_failed("Failed to update progress", e))?;

        Ok(result.rows_affected() == 1)
    }

    /// Soft-delete a notification
    ///
    /// Returns `false` if it does not exist or was already deleted.
    pub async fn mark_deleted(&self, id: &NotificationId) -> Result<bool> {
        let result = sqlx::query("UPDATE notifications SET deleted = 1 WHERE id = ? AND deleted = 0")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| query_failed("Failed to mark notification deleted", e))?;

        Ok(result.rows_affected() == 1)
    }

    /// Soft-deleted notifications that still hold attachment content
    pub async fn query_deleted_with_attachment(&self) -> Result<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            "SELECT {} FROM notifications WHERE deleted = 1 AND attachment_content_uri IS NOT NULL",
            NOTIFICATION_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| query_failed("Failed to query deleted notifications", e))?;

        Ok(rows.into_iter().map(Notification::from).collect())
    }

    /// Notifications older than `cutoff` that still hold attachment content
    pub async fn query_with_attachment_older_than(&self, cutoff: i64) -> Result<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            "SELECT {} FROM notifications WHERE timestamp < ? AND attachment_content_uri IS NOT NULL",
            NOTIFICATION_COLUMNS
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| query_failed("Failed to query old notifications", e))?;

        Ok(rows.into_iter().map(Notification::from).collect())
    }

    /// Soft-delete every notification older than `cutoff`
    ///
    /// Returns the number of notifications newly marked.
    pub async fn mark_deleted_older_than(&self, cutoff: i64) -> Result<u64> {
        let result =
            sqlx::query("UPDATE notifications SET deleted = 1 WHERE timestamp < ? AND deleted = 0")
                .bind(cutoff)
                .execute(&self.pool)
                .await
                .map_err(|e| query_failed("Failed to soft-delete old notifications", e))?;

        Ok(result.rows_affected())
    }

    /// Permanently remove every notification older than `cutoff` that holds no content
    ///
    /// Rows still pointing at content wait until their content has been purged.
    pub async fn remove_older_than(&self, cutoff: i64) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM notifications WHERE timestamp < ? AND attachment_content_uri IS NULL",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(|e| query_failed("Failed to remove old notifications", e))?;

        Ok(result.rows_affected())
    }

    /// Notifications persisted with a running transfer
    pub async fn list_downloading(&self) -> Result<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            "SELECT {} FROM notifications WHERE attachment_url IS NOT NULL AND {}",
            NOTIFICATION_COLUMNS, DOWNLOADING_PREDICATE
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| query_failed("Failed to list downloading notifications", e))?;

        Ok(rows.into_iter().map(Notification::from).collect())
    }

    /// Every content locator referenced by a notification
    pub async fn content_uris(&self) -> Result<Vec<Locator>> {
        let uris: Vec<String> = sqlx::query_scalar(
            "SELECT attachment_content_uri FROM notifications WHERE attachment_content_uri IS NOT NULL",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| query_failed("Failed to list content locators", e))?;

        Ok(uris.into_iter().map(Locator::new).collect())
    }
}

fn size_to_i64(size: u64) -> i64 {
    i64::try_from(size).unwrap_or(i64::MAX)
}
