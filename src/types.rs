//! Core types for alertbox

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::attachment::Attachment;

/// Unique identifier for a notification
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct NotificationId(pub String);

impl NotificationId {
    /// Create a NotificationId from an existing string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for NotificationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for NotificationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for NotificationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Implement sqlx Type, Encode, and Decode for database operations
impl sqlx::Type<sqlx::Sqlite> for NotificationId {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <String as sqlx::Type<sqlx::Sqlite>>::type_info()
    }

    fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for NotificationId {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        sqlx::Encode::<sqlx::Sqlite>::encode_by_ref(&self.0, buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for NotificationId {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let id = <String as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(Self(id))
    }
}

/// Notification priority
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Minimum priority (1)
    Min = 1,
    /// Low priority (2)
    Low = 2,
    /// Default priority (3)
    #[default]
    Default = 3,
    /// High priority (4)
    High = 4,
    /// Maximum/urgent priority (5)
    Max = 5,
}

impl Priority {
    /// Convert integer priority code to Priority enum
    pub fn from_i32(priority: i32) -> Self {
        match priority {
            1 => Priority::Min,
            2 => Priority::Low,
            4 => Priority::High,
            5 => Priority::Max,
            _ => Priority::Default, // Default for 3 and unknown priorities
        }
    }

    /// Convert Priority enum to integer priority code
    pub fn to_i32(self) -> i32 {
        self as i32
    }
}

/// A stored notification
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    /// Unique notification identifier
    pub id: NotificationId,

    /// Unix timestamp (seconds) when the notification was received
    pub timestamp: i64,

    /// Title line (may be empty)
    pub title: String,

    /// Message body
    pub message: String,

    /// Ordered tags
    pub tags: Vec<String>,

    /// Priority
    pub priority: Priority,

    /// Link opened when the notification is clicked
    pub click: Option<String>,

    /// Soft-deletion flag; deleted notifications are hidden but kept until retention removes them
    pub deleted: bool,

    /// Attachment owned by this notification
    pub attachment: Option<Attachment>,
}

/// Attachment announced by an incoming notification
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NewAttachment {
    /// Source location
    pub url: String,

    /// Display name (derived from the URL when absent)
    #[serde(default)]
    pub name: Option<String>,

    /// MIME type
    #[serde(default)]
    pub mime_type: Option<String>,

    /// Size in bytes
    #[serde(default)]
    pub size: Option<u64>,

    /// Unix timestamp after which the URL stops working
    #[serde(default)]
    pub expires: Option<i64>,
}

/// Incoming notification to be stored
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct NewNotification {
    /// Identifier to use (generated when absent)
    #[serde(default)]
    pub id: Option<NotificationId>,

    /// Receive time (now when absent)
    #[serde(default)]
    pub timestamp: Option<i64>,

    /// Title line
    #[serde(default)]
    pub title: String,

    /// Message body
    #[serde(default)]
    pub message: String,

    /// Ordered tags
    #[serde(default)]
    pub tags: Vec<String>,

    /// Priority
    #[serde(default)]
    pub priority: Priority,

    /// Click link
    #[serde(default)]
    pub click: Option<String>,

    /// Attachment, if any
    #[serde(default)]
    pub attachment: Option<NewAttachment>,
}

impl NewNotification {
    /// Build the stored form, filling in generated fields
    pub fn into_notification(self, now: i64) -> Notification {
        let attachment = self.attachment.map(|new| {
            let name = new
                .name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| crate::utils::attachment_name_from_url(&new.url));
            let mut attachment = Attachment::new(name, new.url);
            attachment.mime_type = new.mime_type;
            attachment.size = new.size;
            attachment.expires = new.expires;
            attachment
        });

        Notification {
            id: self.id.unwrap_or_else(NotificationId::generate),
            timestamp: self.timestamp.unwrap_or(now),
            title: self.title,
            message: self.message,
            tags: self.tags,
            priority: self.priority,
            click: self.click,
            deleted: false,
            attachment,
        }
    }
}

/// Event emitted during the notification and attachment lifecycle
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Notification stored
    NotificationAdded {
        /// Notification ID
        id: NotificationId,
    },

    /// Notification soft-deleted by the user
    NotificationDeleted {
        /// Notification ID
        id: NotificationId,
    },

    /// Attachment download accepted and started
    DownloadStarted {
        /// Notification ID
        id: NotificationId,
    },

    /// Attachment download progress update
    Downloading {
        /// Notification ID
        id: NotificationId,
        /// Percent complete (None while the size is unknown)
        #[serde(skip_serializing_if = "Option::is_none")]
        percent: Option<u8>,
        /// Bytes received so far
        bytes: u64,
    },

    /// Attachment download finished
    DownloadComplete {
        /// Notification ID
        id: NotificationId,
        /// Final size in bytes
        size: u64,
    },

    /// Attachment download failed (error or expired source)
    DownloadFailed {
        /// Notification ID
        id: NotificationId,
        /// Error message
        error: String,
    },

    /// Attachment download cancelled by the user
    DownloadCancelled {
        /// Notification ID
        id: NotificationId,
    },

    /// Attachment content removed
    AttachmentDeleted {
        /// Notification ID
        id: NotificationId,
    },

    /// Retention sweep finished
    SweepComplete {
        /// Sweep summary
        report: SweepReport,
    },

    /// Graceful shutdown initiated
    Shutdown,
}

/// Summary of one retention sweep
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SweepReport {
    /// Attachments whose content was purged
    pub content_purged: u64,

    /// Notifications newly marked deleted
    pub soft_deleted: u64,

    /// Notifications permanently removed
    pub hard_deleted: u64,

    /// Unreferenced content entries removed
    pub orphans_removed: u64,

    /// Rows or entries skipped because of an error
    pub failures: u64,
}

/// Automatic soft-deletion policy
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AutoDelete {
    /// Never soft-delete automatically
    Never,
    /// Soft-delete notifications older than this many seconds
    After {
        /// Age threshold in seconds
        seconds: u64,
    },
}

impl AutoDelete {
    /// Decode the persisted value (0 = never)
    pub fn from_seconds(seconds: i64) -> Self {
        if seconds <= 0 {
            AutoDelete::Never
        } else {
            AutoDelete::After {
                seconds: seconds as u64,
            }
        }
    }

    /// Encode for persistence
    pub fn to_seconds(self) -> i64 {
        match self {
            AutoDelete::Never => 0,
            AutoDelete::After { seconds } => i64::try_from(seconds).unwrap_or(i64::MAX),
        }
    }
}

impl Default for AutoDelete {
    fn default() -> Self {
        AutoDelete::After {
            seconds: 30 * 24 * 60 * 60,
        }
    }
}

/// Automatic attachment download policy
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AutoDownload {
    /// Never download without a user request
    Never,
    /// Always download, whatever the size
    Always,
    /// Download attachments of known size up to this many bytes
    UpTo {
        /// Size threshold in bytes
        max_bytes: u64,
    },
}

impl AutoDownload {
    const NEVER_CODE: i64 = 0;
    const ALWAYS_CODE: i64 = 1;

    /// Decode the persisted value (0 = never, 1 = always, else max bytes)
    pub fn from_code(code: i64) -> Self {
        match code {
            c if c <= Self::NEVER_CODE => AutoDownload::Never,
            Self::ALWAYS_CODE => AutoDownload::Always,
            max => AutoDownload::UpTo {
                max_bytes: max as u64,
            },
        }
    }

    /// Encode for persistence
    pub fn to_code(self) -> i64 {
        match self {
            AutoDownload::Never => Self::NEVER_CODE,
            AutoDownload::Always => Self::ALWAYS_CODE,
            AutoDownload::UpTo { max_bytes } => i64::try_from(max_bytes).unwrap_or(i64::MAX),
        }
    }

    /// Whether an attachment of this size may be fetched automatically
    ///
    /// Unknown sizes are only accepted under `Always`.
    pub fn allows(self, size: Option<u64>) -> bool {
        match (self, size) {
            (AutoDownload::Always, _) => true,
            (AutoDownload::UpTo { max_bytes }, Some(size)) => size <= max_bytes,
            _ => false,
        }
    }
}

impl Default for AutoDownload {
    fn default() -> Self {
        AutoDownload::UpTo {
            max_bytes: 1024 * 1024,
        }
    }
}

/// User-adjustable settings persisted in the record store
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Settings {
    /// Automatic soft-deletion policy
    pub auto_delete: AutoDelete,

    /// Automatic download policy
    pub auto_download: AutoDownload,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::Progress;

    #[test]
    fn priority_round_trips_through_i32_for_all_variants() {
        for (variant, code) in [
            (Priority::Min, 1),
            (Priority::Low, 2),
            (Priority::Default, 3),
            (Priority::High, 4),
            (Priority::Max, 5),
        ] {
            assert_eq!(variant.to_i32(), code);
            assert_eq!(Priority::from_i32(code), variant);
        }
        assert_eq!(Priority::from_i32(42), Priority::Default);
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = NotificationId::generate();
        let b = NotificationId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
    }

    #[test]
    fn notification_id_serializes_transparently() {
        let id = NotificationId::new("abc123");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc123\"");
    }

    #[test]
    fn auto_delete_zero_means_never() {
        assert_eq!(AutoDelete::from_seconds(0), AutoDelete::Never);
        assert_eq!(AutoDelete::Never.to_seconds(), 0);
        assert_eq!(
            AutoDelete::from_seconds(86_400),
            AutoDelete::After { seconds: 86_400 }
        );
    }

    #[test]
    fn auto_download_codes() {
        assert_eq!(AutoDownload::from_code(0), AutoDownload::Never);
        assert_eq!(AutoDownload::from_code(1), AutoDownload::Always);
        assert_eq!(
            AutoDownload::from_code(5_000),
            AutoDownload::UpTo { max_bytes: 5_000 }
        );
        assert_eq!(AutoDownload::UpTo { max_bytes: 5_000 }.to_code(), 5_000);
    }

    #[test]
    fn auto_download_threshold_policy() {
        let limit = AutoDownload::UpTo { max_bytes: 1_000 };
        assert!(limit.allows(Some(1_000)));
        assert!(!limit.allows(Some(1_001)));
        assert!(!limit.allows(None), "unknown size must not auto-download");
        assert!(AutoDownload::Always.allows(None));
        assert!(!AutoDownload::Never.allows(Some(1)));
    }

    #[test]
    fn settings_serialize_with_mode_tag() {
        let json = serde_json::to_value(Settings::default()).unwrap();
        assert_eq!(json["auto_delete"]["mode"], "after");
        assert_eq!(json["auto_download"]["max_bytes"], 1024 * 1024);
    }

    #[test]
    fn new_notification_fills_defaults() {
        let new = NewNotification {
            message: "backup finished".into(),
            attachment: Some(NewAttachment {
                url: "https://example.com/logs/backup.log".into(),
                size: Some(42),
                ..Default::default()
            }),
            ..Default::default()
        };

        let notification = new.into_notification(1_700_000_000);
        assert_eq!(notification.timestamp, 1_700_000_000);
        assert_eq!(notification.priority, Priority::Default);
        assert!(!notification.deleted);

        let attachment = notification.attachment.unwrap();
        assert_eq!(attachment.name, "backup.log");
        assert_eq!(attachment.size, Some(42));
        assert_eq!(attachment.progress, Progress::None);
        assert!(attachment.content_uri.is_none());
    }
}
