use super::*;
use crate::attachment::Attachment;
use crate::types::NewNotification;

const URL: &str = "https://files.example.com/log.txt";

#[tokio::test]
async fn test_interrupted_download_fails_on_restart() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = test_config(temp_dir.path());

    let (manager, _) = open_manager(config.clone(), Arc::new(TestFetcher::new())).await;
    let id = manager
        .add_notification(notification_with_attachment("n1", URL, None))
        .await
        .unwrap();

    // Simulate a process that died mid-transfer
    let mut running: Attachment = manager.get_notification(&id).await.unwrap().attachment.unwrap();
    running.progress = Progress::Downloading { percent: Some(37) };
    assert!(
        manager
            .store
            .transition_attachment(&id, Progress::None, &running)
            .await
            .unwrap()
    );
    drop(manager);

    let (restarted, _) = open_manager(config, Arc::new(TestFetcher::new())).await;
    let attachment = restarted.get_notification(&id).await.unwrap().attachment.unwrap();
    assert_eq!(attachment.progress, Progress::Failed);
    assert!(attachment.check_invariants());
    assert!(!restarted.is_downloading(&id).await);
}

#[tokio::test]
async fn test_shutdown_cancels_downloads_and_rejects_new_ones() {
    let (manager, _temp_dir, fetcher) = create_test_manager_with(TestFetcher::gated()).await;
    fetcher.serve(URL, vec![1u8; 4096]);

    let id = manager
        .add_notification(notification_with_attachment("n1", URL, None))
        .await
        .unwrap();
    manager.enqueue(&id, true).await.unwrap();
    let mut events = manager.subscribe();

    manager.shutdown().await.unwrap();

    assert!(!manager.is_downloading(&id).await);
    assert_eq!(progress_of(&manager, &id).await, Progress::Failed);
    assert!(
        drain(&mut events)
            .iter()
            .any(|e| matches!(e, Event::Shutdown))
    );

    let result = manager.enqueue(&id, true).await;
    assert!(matches!(result, Err(Error::ShuttingDown)));
}

#[tokio::test]
async fn test_retention_sweep_emits_report() {
    let (manager, _temp_dir) = create_test_manager().await;
    manager
        .add_notification(NewNotification {
            timestamp: Some(1),
            message: "ancient".to_string(),
            ..NewNotification::default()
        })
        .await
        .unwrap();
    let mut events = manager.subscribe();

    let report = manager.run_retention_sweep().await;
    assert_eq!(report.hard_deleted, 1);
    assert!(manager.list_notifications(true).await.unwrap().is_empty());

    assert!(drain(&mut events).iter().any(
        |e| matches!(e, Event::SweepComplete { report } if report.hard_deleted == 1)
    ));
}
