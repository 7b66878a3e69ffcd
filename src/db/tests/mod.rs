
use crate::attachment::Attachment;
use crate::types::{Notification, NotificationId, Priority};

/// Build a notification with an attachment fixture
pub(super) fn notification(id: &str, timestamp: i64, with_attachment: bool) -> Notification {
    Notification {
        id: NotificationId::new(id),
        timestamp,
        title: format!("title {}", id),
        message: format!("message {}", id),
        tags: vec!["backup".to_string(), "server".to_string()],
        priority: Priority::High,
        click: None,
        deleted: false,
        attachment: with_attachment.then(|| {
            let mut attachment = Attachment::new("report.pdf", "https://example.com/report.pdf");
            attachment.size = Some(4096);
            attachment.mime_type = Some("application/pdf".to_string());
            attachment
        }),
    }
}
