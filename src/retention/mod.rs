//! Two-phase notification retention
//!
//! A sweep runs four phases in order:
//!
//! 1. **Content purge**: attachments of soft-deleted or hard-delete-eligible
//!    notifications lose their content and move to `Deleted`.
//! 2. **Soft delete**: notifications older than the auto-delete age are marked
//!    deleted (skipped when auto-delete is `Never`).
//! 3. **Hard delete**: notifications older than [`HARD_DELETE_AFTER`] are
//!    removed, whatever the auto-delete setting.
//! 4. **Orphan cleanup**: content no row references, that no running download
//!    owns, and that has not been modified within the grace period, is
//!    removed.
//!
//! Phase 1 runs before phase 3 and phase 3 only removes rows without content,
//! so no row disappears while it still points at content. A failure on one
//! row is logged and counted; it never aborts the sweep, and the row is
//! picked up again by the next one.

use crate::attachment::Progress;
use crate::content::{ContentStore, InFlightContent, Locator};
use crate::store::RecordStore;
use crate::types::{AutoDelete, Notification, SweepReport};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

/// Age in seconds after which notifications are removed permanently (4 × 30 days)
pub const HARD_DELETE_AFTER: i64 = 4 * 30 * 24 * 60 * 60;

/// Runs retention sweeps against a record store and a content store
#[derive(Clone)]
pub struct RetentionEngine {
    store: Arc<dyn RecordStore>,
    content: Arc<dyn ContentStore>,
    orphan_grace: Duration,
    in_flight: InFlightContent,
}

impl RetentionEngine {
    /// Create a new retention engine
    ///
    /// `orphan_grace` protects recently written content (such as a transfer in
    /// progress) from orphan cleanup.
    pub fn new(
        store: Arc<dyn RecordStore>,
        content: Arc<dyn ContentStore>,
        orphan_grace: Duration,
    ) -> Self {
        Self {
            store,
            content,
            orphan_grace,
            in_flight: InFlightContent::new(),
        }
    }

    /// Skip content tracked by `in_flight` during orphan cleanup
    pub fn protecting(mut self, in_flight: InFlightContent) -> Self {
        self.in_flight = in_flight;
        self
    }

    /// Run one sweep as of `now` (unix seconds)
    pub async fn sweep(&self, now: i64) -> SweepReport {
        let mut report = SweepReport::default();
        let hard_cutoff = now.saturating_sub(HARD_DELETE_AFTER);

        self.purge_content(hard_cutoff, &mut report).await;
        self.soft_delete(now, &mut report).await;

        match self.store.remove_older_than(hard_cutoff).await {
            Ok(removed) => report.hard_deleted = removed,
            Err(e) => {
                tracing::error!(error = %e, "Failed to remove expired notifications");
                report.failures += 1;
            }
        }

        self.remove_orphans(now, &mut report).await;

        tracing::info!(
            content_purged = report.content_purged,
            soft_deleted = report.soft_deleted,
            hard_deleted = report.hard_deleted,
            orphans_removed = report.orphans_removed,
            failures = report.failures,
            "Retention sweep complete"
        );

        report
    }

    async fn purge_content(&self, hard_cutoff: i64, report: &mut SweepReport) {
        let mut candidates: Vec<Notification> = Vec::new();
        match self.store.query_deleted_with_attachment().await {
            Ok(rows) => candidates.extend(rows),
            Err(e) => {
                tracing::error!(error = %e, "Failed to query deleted notifications");
                report.failures += 1;
            }
        }
        match self.store.query_with_attachment_older_than(hard_cutoff).await {
            Ok(rows) => candidates.extend(rows),
            Err(e) => {
                tracing::error!(error = %e, "Failed to query expiring notifications");
                report.failures += 1;
            }
        }

        let mut seen = HashSet::new();
        for notification in candidates {
            if !seen.insert(notification.id.clone()) {
                continue;
            }
            if self.purge_one(&notification).await {
                report.content_purged += 1;
            } else {
                report.failures += 1;
            }
        }
    }

    /// Delete one row's content and mark it `Deleted`; `false` leaves the row for the next sweep
    async fn purge_one(&self, notification: &Notification) -> bool {
        let id = &notification.id;
        let Some(attachment) = &notification.attachment else {
            return false;
        };
        let Some(locator) = &attachment.content_uri else {
            return false;
        };

        let purged = match attachment.purged() {
            Ok(purged) => purged,
            Err(e) => {
                tracing::warn!(notification_id = %id, error = %e, "Skipping inconsistent attachment");
                return false;
            }
        };

        match self.content.delete(locator).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(notification_id = %id, locator = %locator, "Content already gone");
            }
            Err(e) => {
                tracing::warn!(notification_id = %id, error = %e, "Failed to delete attachment content");
                return false;
            }
        }

        match self
            .store
            .transition_attachment(id, Progress::Done, &purged)
            .await
        {
            Ok(true) => {
                tracing::debug!(notification_id = %id, "Purged attachment content");
                true
            }
            Ok(false) => {
                tracing::warn!(notification_id = %id, "Attachment changed during purge");
                false
            }
            Err(e) => {
                tracing::error!(notification_id = %id, error = %e, "Failed to persist purged attachment");
                false
            }
        }
    }

    async fn soft_delete(&self, now: i64, report: &mut SweepReport) {
        let policy = match self.store.auto_delete().await {
            Ok(policy) => policy,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read auto-delete setting");
                report.failures += 1;
                return;
            }
        };

        let AutoDelete::After { seconds } = policy else {
            return;
        };
        let cutoff = now.saturating_sub(i64::try_from(seconds).unwrap_or(i64::MAX));

        match self.store.mark_deleted_older_than(cutoff).await {
            Ok(marked) => report.soft_deleted = marked,
            Err(e) => {
                tracing::error!(error = %e, "Failed to soft-delete old notifications");
                report.failures += 1;
            }
        }
    }

    async fn remove_orphans(&self, now: i64, report: &mut SweepReport) {
        // Taken before the referenced set: a task that leaves the in-flight set
        // has already recorded its locator as `Done`
        let owned = self.in_flight.snapshot();
        let referenced: HashSet<Locator> = match self.store.content_uris().await {
            Ok(uris) => uris.into_iter().collect(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to list referenced content, skipping orphan cleanup");
                report.failures += 1;
                return;
            }
        };
        let entries = match self.content.list().await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!(error = %e, "Failed to list content store");
                report.failures += 1;
                return;
            }
        };

        let now = UNIX_EPOCH + Duration::from_secs(u64::try_from(now).unwrap_or(0));
        let Some(settled_before) = now.checked_sub(self.orphan_grace) else {
            return;
        };

        for entry in entries {
            if referenced.contains(&entry.locator)
                || owned.contains(&entry.locator)
                || entry.modified >= settled_before
            {
                continue;
            }
            let removed = if entry.pending {
                self.content.discard(&entry.locator).await
            } else {
                self.content.delete(&entry.locator).await
            };
            match removed {
                Ok(_) => {
                    tracing::info!(
                        locator = %entry.locator,
                        pending = entry.pending,
                        "Removed orphaned content"
                    );
                    report.orphans_removed += 1;
                }
                Err(e) => {
                    tracing::warn!(locator = %entry.locator, error = %e, "Failed to remove orphaned content");
                    report.failures += 1;
                }
            }
        }
    }
}
