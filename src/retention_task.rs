//! Periodic retention sweeps
//!
//! [`RetentionTask`] runs [`AttachmentManager::run_retention_sweep`] once at
//! startup and then every `retention.sweep_interval`, until the manager shuts
//! down.
//!
//! # Example
//!
//! ```no_run
//! use alertbox::{AttachmentManager, Config};
//! use alertbox::retention_task::RetentionTask;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = AttachmentManager::new(Config::default()).await?;
//! let task = RetentionTask::new(manager, Duration::from_secs(3600));
//!
//! // Run retention task (blocks until shutdown)
//! tokio::spawn(async move {
//!     task.run().await;
//! });
//! # Ok(())
//! # }
//! ```

use crate::AttachmentManager;
use tokio::time::Duration;
use tracing::{debug, info};

/// Background task that sweeps expired notifications and content
pub struct RetentionTask {
    /// Manager whose stores are swept and whose shutdown ends the task
    manager: AttachmentManager,

    /// Time between sweeps
    interval: Duration,
}

impl RetentionTask {
    /// Creates a new retention task
    pub fn new(manager: AttachmentManager, interval: Duration) -> Self {
        Self { manager, interval }
    }

    /// Starts the retention task
    ///
    /// Sweeps immediately, then sleeps for `interval` between sweeps. Returns
    /// as soon as the manager begins shutting down, also mid-sleep.
    pub async fn run(self) {
        info!(interval = ?self.interval, "Retention task started");
        let shutdown = self.manager.downloads.shutdown.clone();

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            let report = self.manager.run_retention_sweep().await;
            debug!(?report, "Retention sweep finished");

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!("Retention task shutting down");
    }
}
