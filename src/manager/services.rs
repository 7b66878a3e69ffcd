//! Background service starters and retention entry point.

use crate::retention::RetentionEngine;
use crate::retention_task::RetentionTask;
use crate::types::{Event, SweepReport};

use super::{AttachmentManager, unix_now};

impl AttachmentManager {
    /// Run one retention sweep now
    ///
    /// Emits [`Event::SweepComplete`] with the returned report.
    pub async fn run_retention_sweep(&self) -> SweepReport {
        let report = self.retention_engine().sweep(unix_now()).await;
        self.emit_event(Event::SweepComplete { report });
        report
    }

    /// Retention engine over this manager's stores
    ///
    /// Content staged by running downloads is never treated as orphaned.
    pub(crate) fn retention_engine(&self) -> RetentionEngine {
        RetentionEngine::new(
            self.store.clone(),
            self.content.clone(),
            self.config.retention.orphan_grace,
        )
        .protecting(self.downloads.in_flight.clone())
    }

    /// Start the periodic retention task
    pub fn start_retention(&self) -> tokio::task::JoinHandle<()> {
        if !self.config.retention.enabled {
            tracing::info!("Retention disabled, skipping retention task");
            return tokio::spawn(async {});
        }

        let task = RetentionTask::new(self.clone(), self.config.retention.sweep_interval);
        let handle = tokio::spawn(task.run());

        tracing::info!("Retention background task started");

        handle
    }
}
