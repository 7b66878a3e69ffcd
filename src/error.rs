//! Error types for alertbox
//!
//! This module provides the error taxonomy for the library:
//! - Domain-specific error types (Download, Storage, Database)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::attachment::TransitionError;

/// Result type alias for alertbox operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for alertbox
///
/// Failures inside the executor and the retention engine never surface here as
/// fatal conditions; they resolve to a terminal row state and a log record. The
/// variants below are what callers of the public surface can observe.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "content_dir")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Download scheduling or transfer error
    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    /// Content store error
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Notification not found
    #[error("notification not found: {0}")]
    NotFound(String),

    /// Shutdown in progress - not accepting new downloads
    #[error("shutdown in progress: not accepting new downloads")]
    ShuttingDown,

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Stored value could not be decoded
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Download scheduling and transfer errors
#[derive(Debug, Error)]
pub enum DownloadError {
    /// A transfer for this notification is already running
    #[error("download for notification {id} is already in flight")]
    AlreadyInFlight {
        /// The notification whose attachment is being downloaded
        id: String,
    },

    /// Automatic download declined by the size policy
    #[error("attachment of notification {id} not auto-downloaded: {reason}")]
    ThresholdExceeded {
        /// The notification whose attachment was declined
        id: String,
        /// Why the policy declined (size over limit, unknown size, disabled)
        reason: String,
    },

    /// The source URL is past its expiry time
    #[error("attachment of notification {id} expired at {expires}")]
    SourceExpired {
        /// The notification whose attachment expired
        id: String,
        /// Unix timestamp of the expiry
        expires: i64,
    },

    /// Network or I/O failure while streaming
    #[error("transfer failed for notification {id}: {reason}")]
    Transfer {
        /// The notification being downloaded
        id: String,
        /// What went wrong
        reason: String,
    },

    /// Content is already present locally
    #[error("attachment of notification {id} is already downloaded")]
    AlreadyDownloaded {
        /// The notification that already holds content
        id: String,
    },

    /// The notification carries no attachment
    #[error("notification {id} has no attachment")]
    NoAttachment {
        /// The notification without attachment
        id: String,
    },

    /// Downloads are refused for soft-deleted notifications
    #[error("notification {id} is deleted")]
    NotificationDeleted {
        /// The deleted notification
        id: String,
    },

    /// Requested state change is not valid from the current state
    #[error("invalid attachment transition for notification {id}: {source}")]
    InvalidTransition {
        /// The notification whose attachment was being changed
        id: String,
        /// The rejected transition
        #[source]
        source: TransitionError,
    },

    /// The row changed underneath a conditional update
    #[error("attachment of notification {id} was modified concurrently")]
    Conflict {
        /// The notification whose row changed
        id: String,
    },
}

/// Content store errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Locator does not resolve to stored content
    #[error("content not found: {0}")]
    NotFound(String),

    /// Locator is malformed or escapes the store root
    #[error("invalid locator: {0}")]
    InvalidLocator(String),

    /// Write target could not be created or written
    #[error("write failed for {locator}: {reason}")]
    WriteFailed {
        /// Locator of the content being written
        locator: String,
        /// The underlying failure
        reason: String,
    },

    /// Content could not be removed
    #[error("delete failed for {locator}: {reason}")]
    DeleteFailed {
        /// Locator of the content being removed
        locator: String,
        /// The underlying failure
        reason: String,
    },
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "already_in_flight",
///     "message": "download error: download for notification abc is already in flight"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "threshold_exceeded")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an API error with additional details
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    /// Create a "not found" error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new("not_found", format!("{} not found", resource.into()))
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }

    /// Create an "unauthorized" error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("unauthorized", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            Error::Config { .. } => 400,

            Error::NotFound(_) => 404,
            Error::Storage(StorageError::NotFound(_)) => 404,
            Error::Download(DownloadError::NoAttachment { .. }) => 404,

            Error::Download(DownloadError::AlreadyInFlight { .. }) => 409,
            Error::Download(DownloadError::AlreadyDownloaded { .. }) => 409,
            Error::Download(DownloadError::NotificationDeleted { .. }) => 409,
            Error::Download(DownloadError::InvalidTransition { .. }) => 409,
            Error::Download(DownloadError::Conflict { .. }) => 409,

            Error::Download(DownloadError::SourceExpired { .. }) => 410,

            Error::Download(DownloadError::ThresholdExceeded { .. }) => 422,
            Error::Storage(StorageError::InvalidLocator(_)) => 422,

            Error::Download(DownloadError::Transfer { .. }) => 502,
            Error::Network(_) => 502,

            Error::ShuttingDown => 503,

            Error::Database(_) => 500,
            Error::Sqlx(_) => 500,
            Error::Storage(_) => 500,
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Database(_) => "database_error",
            Error::Sqlx(_) => "database_error",
            Error::Download(e) => match e {
                DownloadError::AlreadyInFlight { .. } => "already_in_flight",
                DownloadError::ThresholdExceeded { .. } => "threshold_exceeded",
                DownloadError::SourceExpired { .. } => "source_expired",
                DownloadError::Transfer { .. } => "transfer_error",
                DownloadError::AlreadyDownloaded { .. } => "already_downloaded",
                DownloadError::NoAttachment { .. } => "no_attachment",
                DownloadError::NotificationDeleted { .. } => "notification_deleted",
                DownloadError::InvalidTransition { .. } => "invalid_transition",
                DownloadError::Conflict { .. } => "conflict",
            },
            Error::Storage(e) => match e {
                StorageError::NotFound(_) => "content_not_found",
                StorageError::InvalidLocator(_) => "invalid_locator",
                StorageError::WriteFailed { .. } => "storage_write_failed",
                StorageError::DeleteFailed { .. } => "storage_delete_failed",
            },
            Error::Io(_) => "io_error",
            Error::NotFound(_) => "not_found",
            Error::ShuttingDown => "shutting_down",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Download(DownloadError::SourceExpired { id, expires }) => Some(
                serde_json::json!({ "notification_id": id, "expires": expires }),
            ),
            Error::Download(DownloadError::ThresholdExceeded { id, reason }) => Some(
                serde_json::json!({ "notification_id": id, "reason": reason }),
            ),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({ "key": key })),
            _ => None,
        };

        match details {
            Some(details) => ApiError::with_details(code, message, details),
            None => ApiError::new(code, message),
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_flight_maps_to_conflict() {
        let error = Error::Download(DownloadError::AlreadyInFlight { id: "n1".into() });
        assert_eq!(error.status_code(), 409);
        assert_eq!(error.error_code(), "already_in_flight");
    }

    #[test]
    fn test_expired_maps_to_gone() {
        let error = Error::Download(DownloadError::SourceExpired {
            id: "n1".into(),
            expires: 1_700_000_000,
        });
        assert_eq!(error.status_code(), 410);

        let api: ApiError = error.into();
        assert_eq!(api.error.code, "source_expired");
        let details = api.error.details.unwrap();
        assert_eq!(details["expires"], 1_700_000_000);
    }

    #[test]
    fn test_threshold_maps_to_unprocessable() {
        let error = Error::Download(DownloadError::ThresholdExceeded {
            id: "n1".into(),
            reason: "size unknown".into(),
        });
        assert_eq!(error.status_code(), 422);
        assert!(error.to_string().contains("size unknown"));
    }

    #[test]
    fn test_storage_errors_are_server_side() {
        let error = Error::Storage(StorageError::DeleteFailed {
            locator: "abc_file.png".into(),
            reason: "permission denied".into(),
        });
        assert_eq!(error.status_code(), 500);
        assert_eq!(error.error_code(), "storage_delete_failed");
    }

    #[test]
    fn test_shutting_down_is_unavailable() {
        assert_eq!(Error::ShuttingDown.status_code(), 503);
    }
}
