use super::*;
use crate::types::{AutoDownload, NewNotification};

const URL: &str = "https://files.example.com/report.pdf";

#[tokio::test]
async fn test_double_enqueue_runs_once() {
    let (manager, _temp_dir, fetcher) = create_test_manager_with(TestFetcher::gated()).await;
    fetcher.serve(URL, vec![1u8; 4096]);

    // Unknown size: declined by the default auto-download policy
    let id = manager
        .add_notification(notification_with_attachment("n1", URL, None))
        .await
        .unwrap();
    assert_eq!(progress_of(&manager, &id).await, Progress::None);

    manager.enqueue(&id, true).await.unwrap();
    let second = manager.enqueue(&id, true).await;
    assert!(matches!(
        second,
        Err(Error::Download(DownloadError::AlreadyInFlight { .. }))
    ));

    fetcher.release(16);
    wait_until_idle(&manager, &id).await;

    assert_eq!(fetcher.calls(), 1);
    assert_eq!(progress_of(&manager, &id).await, Progress::Done);
}

#[tokio::test]
async fn test_concurrent_enqueue_admits_one() {
    let (manager, _temp_dir, fetcher) = create_test_manager_with(TestFetcher::gated()).await;
    fetcher.serve(URL, vec![1u8; 2048]);

    let id = manager
        .add_notification(notification_with_attachment("n1", URL, None))
        .await
        .unwrap();

    let (a, b) = tokio::join!(manager.enqueue(&id, true), manager.enqueue(&id, true));
    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);

    fetcher.release(16);
    wait_until_idle(&manager, &id).await;
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn test_cancel_without_download_is_noop() {
    let (manager, _temp_dir) = create_test_manager().await;
    let id = manager
        .add_notification(notification_with_attachment("n1", URL, None))
        .await
        .unwrap();
    let mut events = manager.subscribe();

    manager.cancel(&id).await.unwrap();

    assert_eq!(progress_of(&manager, &id).await, Progress::None);
    assert!(drain(&mut events).is_empty());
}

#[tokio::test]
async fn test_expired_attachment_fails_without_fetch() {
    let (manager, _temp_dir, fetcher) = create_test_manager_with(TestFetcher::new()).await;
    fetcher.serve(URL, vec![1u8; 100]);
    let mut events = manager.subscribe();

    let mut new = notification_with_attachment("n1", URL, Some(100));
    if let Some(attachment) = new.attachment.as_mut() {
        attachment.expires = Some(unix_now() - 60);
    }

    // Automatic attempt on ingest
    let id = manager.add_notification(new).await.unwrap();
    assert_eq!(progress_of(&manager, &id).await, Progress::Failed);
    assert!(
        drain(&mut events)
            .iter()
            .any(|e| matches!(e, Event::DownloadFailed { .. }))
    );

    // Forced attempt
    let result = manager.enqueue(&id, true).await;
    assert!(matches!(
        result,
        Err(Error::Download(DownloadError::SourceExpired { .. }))
    ));
    assert_eq!(progress_of(&manager, &id).await, Progress::Failed);
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test]
async fn test_threshold_declines_automatic_but_not_forced() {
    let (manager, _temp_dir, fetcher) = create_test_manager_with(TestFetcher::new()).await;
    fetcher.serve(URL, vec![1u8; 4096]);
    manager
        .update_settings(crate::types::Settings {
            auto_download: AutoDownload::UpTo { max_bytes: 1024 },
            ..manager.settings().await.unwrap()
        })
        .await
        .unwrap();

    let id = manager
        .add_notification(notification_with_attachment("n1", URL, Some(4096)))
        .await
        .unwrap();
    assert_eq!(progress_of(&manager, &id).await, Progress::None);

    let result = manager.enqueue(&id, false).await;
    assert!(matches!(
        result,
        Err(Error::Download(DownloadError::ThresholdExceeded { .. }))
    ));
    assert_eq!(fetcher.calls(), 0);

    manager.enqueue(&id, true).await.unwrap();
    wait_until_idle(&manager, &id).await;
    assert_eq!(progress_of(&manager, &id).await, Progress::Done);
}

#[tokio::test]
async fn test_never_policy_declines_all_automatic_downloads() {
    let (manager, _temp_dir, fetcher) = create_test_manager_with(TestFetcher::new()).await;
    fetcher.serve(URL, vec![1u8; 10]);
    manager
        .update_settings(crate::types::Settings {
            auto_download: AutoDownload::Never,
            ..manager.settings().await.unwrap()
        })
        .await
        .unwrap();

    let id = manager
        .add_notification(notification_with_attachment("n1", URL, Some(10)))
        .await
        .unwrap();
    assert_eq!(progress_of(&manager, &id).await, Progress::None);
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test]
async fn test_always_policy_accepts_unknown_size() {
    let (manager, _temp_dir, fetcher) = create_test_manager_with(TestFetcher::new()).await;
    fetcher.serve(URL, vec![1u8; 10]);
    manager
        .update_settings(crate::types::Settings {
            auto_download: AutoDownload::Always,
            ..manager.settings().await.unwrap()
        })
        .await
        .unwrap();

    let id = manager
        .add_notification(notification_with_attachment("n1", URL, None))
        .await
        .unwrap();
    wait_until_idle(&manager, &id).await;
    assert_eq!(progress_of(&manager, &id).await, Progress::Done);
}

#[tokio::test]
async fn test_enqueue_rejects_unusable_notifications() {
    let (manager, _temp_dir) = create_test_manager().await;

    let missing = manager.enqueue(&NotificationId::new("missing"), true).await;
    assert!(matches!(missing, Err(Error::NotFound(_))));

    let plain = manager
        .add_notification(NewNotification {
            message: "no attachment".to_string(),
            ..NewNotification::default()
        })
        .await
        .unwrap();
    let result = manager.enqueue(&plain, true).await;
    assert!(matches!(
        result,
        Err(Error::Download(DownloadError::NoAttachment { .. }))
    ));

    let id = manager
        .add_notification(notification_with_attachment("n1", URL, None))
        .await
        .unwrap();
    manager.delete_notification(&id).await.unwrap();
    let result = manager.enqueue(&id, true).await;
    assert!(matches!(
        result,
        Err(Error::Download(DownloadError::NotificationDeleted { .. }))
    ));
}

#[tokio::test]
async fn test_done_with_content_is_not_redownloaded() {
    let (manager, _temp_dir, fetcher) = create_test_manager_with(TestFetcher::new()).await;
    fetcher.serve(URL, vec![1u8; 10]);

    let id = manager
        .add_notification(notification_with_attachment("n1", URL, Some(10)))
        .await
        .unwrap();
    wait_until_idle(&manager, &id).await;
    assert_eq!(progress_of(&manager, &id).await, Progress::Done);

    let result = manager.enqueue(&id, true).await;
    assert!(matches!(
        result,
        Err(Error::Download(DownloadError::AlreadyDownloaded { .. }))
    ));

    // Content vanished underneath the row: a fresh download is allowed
    let locator = manager
        .get_notification(&id)
        .await
        .unwrap()
        .attachment
        .unwrap()
        .content_uri
        .unwrap();
    manager.content.delete(&locator).await.unwrap();

    manager.enqueue(&id, true).await.unwrap();
    wait_until_idle(&manager, &id).await;
    assert_eq!(fetcher.calls(), 2);

    let attachment = manager.get_notification(&id).await.unwrap().attachment.unwrap();
    assert_eq!(attachment.progress, Progress::Done);
    assert_ne!(attachment.content_uri, Some(locator));
}

#[tokio::test]
async fn test_retry_after_failure() {
    let (manager, _temp_dir, fetcher) = create_test_manager_with(TestFetcher::new()).await;

    let id = manager
        .add_notification(notification_with_attachment("n1", URL, Some(10)))
        .await
        .unwrap();
    wait_until_idle(&manager, &id).await;
    assert_eq!(progress_of(&manager, &id).await, Progress::Failed);

    fetcher.serve(URL, vec![1u8; 10]);
    manager.enqueue(&id, true).await.unwrap();
    wait_until_idle(&manager, &id).await;
    assert_eq!(progress_of(&manager, &id).await, Progress::Done);
}
