use std::sync::Arc;
use std::time::Duration;

use paymentjob::shutdown::ShutdownManager;
use paymentjob_testing_utils::{payment_payload, MockMessageSource, MockRecordStore, TestEnv};
use paymentjob_worker::{run_pipeline, StopReason};
use tokio::sync::Notify;

#[tokio::test]
async fn test_shutdown_manager_drains_worker_pipeline() {
    let manager = ShutdownManager::new();
    let source = MockMessageSource::holding_open();
    let store = MockRecordStore::new();
    for i in 1..=3 {
        source.push_json(&format!("pay-{i}"), payment_payload(i, "BRL"));
    }

    let rx = manager.subscribe().await;
    let worker = tokio::spawn(run_pipeline(
        source.clone(),
        store.clone(),
        "payments",
        None,
        rx,
    ));

    let watched = store.clone();
    assert!(
        TestEnv::wait_for(
            move || {
                let store = watched.clone();
                async move { store.record_count() == 3 }
            },
            Duration::from_secs(2),
        )
        .await
    );

    manager.shutdown().await;
    let (reason, stats) = tokio::time::timeout(Duration::from_secs(2), worker)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    assert_eq!(reason, StopReason::Shutdown);
    assert_eq!(stats.acked, 3);
    assert_eq!(source.acked(), vec![1, 2, 3]);
    assert!(source.is_closed());
    assert_eq!(store.close_calls(), 1);
}

#[tokio::test]
async fn test_shutdown_waits_for_in_flight_message() {
    let manager = ShutdownManager::new();
    let gate = Arc::new(Notify::new());
    let source = MockMessageSource::holding_open();
    let store = MockRecordStore::new().with_insert_gate(gate.clone());
    source.push_json("pay-1", payment_payload(5, "BRL"));

    let rx = manager.subscribe().await;
    let worker = tokio::spawn(run_pipeline(
        source.clone(),
        store.clone(),
        "payments",
        None,
        rx,
    ));

    let watched = source.clone();
    assert!(
        TestEnv::wait_for(
            move || {
                let source = watched.clone();
                async move { source.unacked_count() == 1 }
            },
            Duration::from_secs(2),
        )
        .await
    );

    manager.shutdown().await;
    assert!(!worker.is_finished());
    gate.notify_one();

    let (reason, stats) = tokio::time::timeout(Duration::from_secs(2), worker)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    assert_eq!(reason, StopReason::Shutdown);
    assert_eq!(stats.acked, 1);
    assert_eq!(source.acked(), vec![1]);
    assert_eq!(store.record_count(), 1);
}
