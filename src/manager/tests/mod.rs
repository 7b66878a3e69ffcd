mod lifecycle;
mod notifications;
mod scheduler;

use super::test_helpers::*;
use super::*;
use crate::attachment::Progress;
use crate::error::{DownloadError, Error};
use crate::types::Event;

/// Drain every event currently buffered
fn drain(events: &mut tokio::sync::broadcast::Receiver<Event>) -> Vec<Event> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

/// Current attachment progress of `id`
async fn progress_of(manager: &AttachmentManager, id: &NotificationId) -> Progress {
    manager
        .get_notification(id)
        .await
        .unwrap()
        .attachment
        .unwrap()
        .progress
}
