//! # alertbox
//!
//! Storage and attachment lifecycle for received push notifications.
//!
//! ## What it does
//!
//! - **Stores notifications** - Persisted in SQLite with soft deletion
//! - **Downloads attachments** - At most one transfer per notification, with
//!   durable progress and cancellation
//! - **Applies a size policy** - Small attachments download automatically,
//!   larger ones wait for a user request
//! - **Sweeps retention** - Old notifications and their files are removed on a
//!   schedule, together with content nothing references
//! - **Event-driven** - Consumers subscribe to lifecycle events instead of polling
//!
//! ## Quick Start
//!
//! ```no_run
//! use alertbox::{AttachmentManager, Config, NewAttachment, NewNotification};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = AttachmentManager::new(Config::default()).await?;
//!
//!     let mut events = manager.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     manager
//!         .add_notification(NewNotification {
//!             message: "Nightly backup finished".to_string(),
//!             attachment: Some(NewAttachment {
//!                 url: "https://files.example.com/backup.log".to_string(),
//!                 ..Default::default()
//!             }),
//!             ..Default::default()
//!         })
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Attachment state machine and status
pub mod attachment;
/// Configuration types
pub mod config;
/// Local attachment content storage
pub mod content;
/// Database persistence layer
pub mod db;
/// Error types
pub mod error;
/// Attachment source fetching
pub mod fetch;
/// Notification and download orchestration (decomposed into focused submodules)
pub mod manager;
/// Retention sweeps
pub mod retention;
/// Periodic retention task
pub mod retention_task;
/// Record store abstraction
pub mod store;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use attachment::{Attachment, AttachmentStatus, Progress};
pub use config::Config;
pub use content::{ContentStore, FsContentStore};
pub use db::Database;
pub use error::{
    ApiError, DatabaseError, DownloadError, Error, ErrorDetail, Result, StorageError,
    ToHttpStatus,
};
pub use fetch::{Fetcher, HttpFetcher};
pub use manager::AttachmentManager;
pub use retention::RetentionEngine;
pub use store::RecordStore;
pub use types::{
    AutoDelete, AutoDownload, Event, NewAttachment, NewNotification, Notification,
    NotificationId, Priority, Settings, SweepReport,
};

/// Helper function to run the manager with graceful signal handling.
///
/// Waits for a termination signal and then calls the manager's `shutdown()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use alertbox::{AttachmentManager, Config, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let manager = AttachmentManager::new(Config::default()).await?;
///     let _retention = manager.start_retention();
///     let _api = std::sync::Arc::new(manager.clone()).spawn_api_server();
///
///     run_with_shutdown(manager).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(manager: AttachmentManager) -> Result<()> {
    wait_for_signal().await;
    manager.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
