//! Database layer for alertbox
//!
//! Handles SQLite persistence for notifications (with their embedded
//! attachment state) and user settings.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] - Database lifecycle, schema migrations
//! - [`notifications`] - Notification CRUD, attachment transitions, retention queries
//! - [`settings`] - Persisted user settings

use crate::attachment::{Attachment, Progress};
use crate::content::Locator;
use crate::types::{Notification, NotificationId, Priority};
use sqlx::{FromRow, sqlite::SqlitePool};

mod migrations;
mod notifications;
mod settings;

/// Column list shared by every notification query
pub(crate) const NOTIFICATION_COLUMNS: &str = r#"
    id, timestamp, title, message, tags, priority, click, deleted,
    attachment_name, attachment_url, attachment_mime_type, attachment_size,
    attachment_expires, attachment_content_uri, attachment_progress
"#;

/// Notification record from database (raw from SQLite)
#[derive(Debug, Clone, FromRow)]
pub struct NotificationRow {
    /// Notification ID
    pub id: NotificationId,
    /// Unix timestamp when the notification was received
    pub timestamp: i64,
    /// Title line
    pub title: String,
    /// Message body
    pub message: String,
    /// Tags as a JSON array
    pub tags: String,
    /// Priority code (1-5)
    pub priority: i32,
    /// Click link
    pub click: Option<String>,
    /// Soft-deletion flag (0 = visible, 1 = deleted)
    pub deleted: i32,
    /// Attachment display name
    pub attachment_name: Option<String>,
    /// Attachment source URL; NULL means the notification has no attachment
    pub attachment_url: Option<String>,
    /// Attachment MIME type
    pub attachment_mime_type: Option<String>,
    /// Attachment size in bytes
    pub attachment_size: Option<i64>,
    /// Unix timestamp after which the source URL is invalid
    pub attachment_expires: Option<i64>,
    /// Content locator, set only when the download completed
    pub attachment_content_uri: Option<String>,
    /// Progress code (see [`crate::attachment::progress_code`])
    pub attachment_progress: i32,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        let tags = serde_json::from_str(&row.tags).unwrap_or_else(|e| {
            tracing::warn!(notification_id = %row.id, error = %e, "unreadable tags column");
            Vec::new()
        });

        let attachment = row.attachment_url.map(|url| Attachment {
            name: row.attachment_name.unwrap_or_default(),
            url,
            content_uri: row.attachment_content_uri.map(Locator::new),
            mime_type: row.attachment_mime_type,
            size: row.attachment_size.and_then(|s| u64::try_from(s).ok()),
            expires: row.attachment_expires,
            progress: Progress::from_code(row.attachment_progress),
        });

        Notification {
            id: row.id,
            timestamp: row.timestamp,
            title: row.title,
            message: row.message,
            tags,
            priority: Priority::from_i32(row.priority),
            click: row.click,
            deleted: row.deleted != 0,
            attachment,
        }
    }
}

/// Database handle for alertbox
pub struct Database {
    pool: SqlitePool,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
