use super::*;
use crate::attachment::StatusKind;
use crate::types::{AutoDelete, AutoDownload, NewNotification, Settings};

const URL: &str = "https://files.example.com/scan.png";

#[tokio::test]
async fn test_add_generates_id_and_lists_newest_first() {
    let (manager, _temp_dir) = create_test_manager().await;

    let older = manager
        .add_notification(NewNotification {
            timestamp: Some(1_000),
            message: "older".to_string(),
            ..NewNotification::default()
        })
        .await
        .unwrap();
    let newer = manager
        .add_notification(NewNotification {
            timestamp: Some(2_000),
            message: "newer".to_string(),
            ..NewNotification::default()
        })
        .await
        .unwrap();
    assert_eq!(older.as_str().len(), 32);

    let list = manager.list_notifications(false).await.unwrap();
    let ids: Vec<_> = list.iter().map(|n| n.id.clone()).collect();
    assert_eq!(ids, vec![newer, older]);
}

#[tokio::test]
async fn test_attachment_name_derived_from_url() {
    let (manager, _temp_dir) = create_test_manager().await;
    let id = manager
        .add_notification(notification_with_attachment("n1", URL, None))
        .await
        .unwrap();

    let attachment = manager.get_notification(&id).await.unwrap().attachment.unwrap();
    assert_eq!(attachment.name, "scan.png");
    assert_eq!(attachment.progress, Progress::None);
}

#[tokio::test]
async fn test_reingest_refreshes_metadata_only() {
    let (manager, _temp_dir, fetcher) = create_test_manager_with(TestFetcher::new()).await;
    fetcher.serve(URL, vec![1u8; 64]);

    let id = manager
        .add_notification(notification_with_attachment("n1", URL, Some(64)))
        .await
        .unwrap();
    wait_until_idle(&manager, &id).await;

    let mut again = notification_with_attachment("n1", URL, Some(64));
    again.title = "Updated title".to_string();
    manager.add_notification(again).await.unwrap();
    wait_until_idle(&manager, &id).await;

    let n = manager.get_notification(&id).await.unwrap();
    assert_eq!(n.title, "Updated title");
    assert_eq!(n.attachment.unwrap().progress, Progress::Done);
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn test_delete_notification_is_soft() {
    let (manager, _temp_dir) = create_test_manager().await;
    let id = manager
        .add_notification(notification_with_attachment("n1", URL, None))
        .await
        .unwrap();
    let mut events = manager.subscribe();

    manager.delete_notification(&id).await.unwrap();

    assert!(manager.get_notification(&id).await.unwrap().deleted);
    assert!(manager.list_notifications(false).await.unwrap().is_empty());
    assert_eq!(manager.list_notifications(true).await.unwrap().len(), 1);
    assert!(
        drain(&mut events)
            .iter()
            .any(|e| matches!(e, Event::NotificationDeleted { .. }))
    );

    let missing = manager.delete_notification(&NotificationId::new("nope")).await;
    assert!(matches!(missing, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_delete_attachment_purges_content() {
    let (manager, _temp_dir, fetcher) = create_test_manager_with(TestFetcher::new()).await;
    fetcher.serve(URL, vec![1u8; 64]);
    let id = manager
        .add_notification(notification_with_attachment("n1", URL, Some(64)))
        .await
        .unwrap();
    wait_until_idle(&manager, &id).await;
    let locator = manager
        .get_notification(&id)
        .await
        .unwrap()
        .attachment
        .unwrap()
        .content_uri
        .unwrap();
    let mut events = manager.subscribe();

    manager.delete_attachment(&id).await.unwrap();

    let attachment = manager.get_notification(&id).await.unwrap().attachment.unwrap();
    assert_eq!(attachment.progress, Progress::Deleted);
    assert!(attachment.check_invariants());
    assert!(!manager.content.exists(&locator).await);
    assert!(
        drain(&mut events)
            .iter()
            .any(|e| matches!(e, Event::AttachmentDeleted { .. }))
    );

    let again = manager.delete_attachment(&id).await;
    assert!(matches!(
        again,
        Err(Error::Download(DownloadError::InvalidTransition { .. }))
    ));

    // Deleted content may be fetched again while the source is valid
    manager.enqueue(&id, true).await.unwrap();
    wait_until_idle(&manager, &id).await;
    assert_eq!(progress_of(&manager, &id).await, Progress::Done);
}

#[tokio::test]
async fn test_delete_attachment_leaves_running_download_alone() {
    let (manager, _temp_dir, fetcher) = create_test_manager_with(TestFetcher::gated()).await;
    fetcher.serve(URL, vec![1u8; 4096]);
    let id = manager
        .add_notification(notification_with_attachment("n1", URL, Some(4096)))
        .await
        .unwrap();
    assert!(manager.is_downloading(&id).await);
    fetcher.release(1);

    let rejected = manager.delete_attachment(&id).await;
    assert!(
        matches!(
            rejected,
            Err(Error::Download(DownloadError::InvalidTransition { .. }))
        ),
        "got {rejected:?}"
    );
    assert!(manager.is_downloading(&id).await);

    fetcher.release(3);
    wait_until_idle(&manager, &id).await;
    let attachment = manager.get_notification(&id).await.unwrap().attachment.unwrap();
    assert_eq!(attachment.progress, Progress::Done);
    assert!(manager.content.exists(&attachment.content_uri.unwrap()).await);
}

#[tokio::test]
async fn test_status_reflects_missing_content() {
    let (manager, _temp_dir, fetcher) = create_test_manager_with(TestFetcher::new()).await;
    fetcher.serve(URL, vec![1u8; 2048]);
    let id = manager
        .add_notification(notification_with_attachment("n1", URL, Some(2048)))
        .await
        .unwrap();
    wait_until_idle(&manager, &id).await;

    let status = manager.attachment_status(&id).await.unwrap();
    assert_eq!(status.state, StatusKind::Downloaded);
    assert_eq!(status.to_string(), "2.0 KB");

    let (attachment, _) = manager.open_content(&id).await.unwrap();
    manager
        .content
        .delete(attachment.content_uri.as_ref().unwrap())
        .await
        .unwrap();

    let status = manager.attachment_status(&id).await.unwrap();
    assert_eq!(status.state, StatusKind::Deleted);
    assert_eq!(status.to_string(), "2.0 KB, deleted");
}

#[tokio::test]
async fn test_open_content_requires_download() {
    let (manager, _temp_dir) = create_test_manager().await;
    let id = manager
        .add_notification(notification_with_attachment("n1", URL, None))
        .await
        .unwrap();

    let result = manager.open_content(&id).await;
    assert!(matches!(
        result,
        Err(Error::Storage(crate::error::StorageError::NotFound(_)))
    ));
}

#[tokio::test]
async fn test_settings_are_seeded_and_updatable() {
    let (manager, _temp_dir) = create_test_manager().await;
    assert_eq!(manager.settings().await.unwrap(), Settings::default());

    let updated = Settings {
        auto_delete: AutoDelete::Never,
        auto_download: AutoDownload::Always,
    };
    manager.update_settings(updated).await.unwrap();
    assert_eq!(manager.settings().await.unwrap(), updated);
}
