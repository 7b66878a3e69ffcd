//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`notifications`] - Notification ingest, listing and deletion
//! - [`attachments`] - Attachment status, download control and content
//! - [`settings`] - Persisted user settings
//! - [`system`] - Health, events, OpenAPI, retention

use serde::{Deserialize, Serialize};

mod attachments;
mod notifications;
mod settings;
mod system;

// Re-export all handlers so `routes::function_name` works
pub use attachments::*;
pub use notifications::*;
pub use settings::*;
pub use system::*;

/// Query parameters for GET /notifications
#[derive(Debug, Default, Deserialize, Serialize, utoipa::IntoParams, utoipa::ToSchema)]
pub struct ListNotificationsQuery {
    /// Include soft-deleted notifications (default: false)
    #[serde(default)]
    pub include_deleted: bool,
}

/// Response for POST /notifications
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct AddNotificationResponse {
    /// ID of the stored notification
    pub id: crate::types::NotificationId,
}

/// Response for GET /notifications/:id/attachment
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct AttachmentStatusResponse {
    /// The attachment as stored
    pub attachment: crate::attachment::Attachment,
    /// Structured status
    pub status: crate::attachment::AttachmentStatus,
    /// Human-readable status line, e.g. "1.2 MB, downloading, 45%"
    pub summary: String,
    /// Whether a download request would make sense now
    pub can_download: bool,
}
