use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use paymentjob_core::{FixedBackoff, PaymentJobError};
use paymentjob_testing_utils::{payment_payload, worker_config, MockMessageSource, MockRecordStore};
use paymentjob_worker::{StopReason, WorkerService};
use tokio::sync::broadcast;

fn connect_to<T: Clone>(
    target: &T,
) -> impl FnMut() -> std::future::Ready<paymentjob_core::Result<T>> {
    let target = target.clone();
    move || std::future::ready(Ok(target.clone()))
}

fn refuse<T>(
    target: &'static str,
    attempts: Arc<AtomicUsize>,
) -> impl FnMut() -> std::future::Ready<paymentjob_core::Result<T>> {
    move || {
        attempts.fetch_add(1, Ordering::SeqCst);
        std::future::ready(Err(PaymentJobError::MessageQueue(format!(
            "{target}: connection refused"
        ))))
    }
}

#[tokio::test]
async fn test_migrates_before_consuming() {
    let service = WorkerService::new(worker_config("payments", 3));
    let store = MockRecordStore::new();
    let source = MockMessageSource::new();
    source.push_json("pay-1", payment_payload(40, "USD"));
    let (_tx, rx) = broadcast::channel(1);

    let migrations_at_consume = Arc::new(AtomicUsize::new(usize::MAX));
    let connect_source = {
        let store = store.clone();
        let source = source.clone();
        let seen = migrations_at_consume.clone();
        move || {
            seen.store(store.migrations(), Ordering::SeqCst);
            std::future::ready(Ok::<_, PaymentJobError>(source.clone()))
        }
    };

    let (reason, stats) = service
        .run_with(connect_to(&store), connect_source, rx)
        .await
        .unwrap();

    assert_eq!(migrations_at_consume.load(Ordering::SeqCst), 1);
    assert_eq!(store.migrations(), 1);
    assert_eq!(reason, StopReason::SourceClosed);
    assert_eq!(stats.acked, 1);
    assert_eq!(store.record_count(), 1);
    assert_eq!(source.close_calls(), 1);
    assert_eq!(store.close_calls(), 1);
}

#[tokio::test]
async fn test_broker_exhaustion_closes_store_and_fails() {
    let service = WorkerService::new(worker_config("payments", 3));
    let store = MockRecordStore::new();
    let attempts = Arc::new(AtomicUsize::new(0));
    let (_tx, rx) = broadcast::channel(1);

    let result = service
        .run_with(
            connect_to(&store),
            refuse::<MockMessageSource>("RabbitMQ", attempts.clone()),
            rx,
        )
        .await;

    match result {
        Err(PaymentJobError::RetriesExhausted {
            target, attempts: n, ..
        }) => {
            assert_eq!(target, "RabbitMQ");
            assert_eq!(n, 3);
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(store.migrations(), 1);
    assert_eq!(store.close_calls(), 1);
}

#[tokio::test]
async fn test_database_exhaustion_is_fatal_before_broker_connect() {
    let service = WorkerService::new(worker_config("payments", 2));
    let source = MockMessageSource::new();
    let store_attempts = Arc::new(AtomicUsize::new(0));
    let broker_attempts = Arc::new(AtomicUsize::new(0));
    let (_tx, rx) = broadcast::channel(1);

    let connect_source = {
        let source = source.clone();
        let broker_attempts = broker_attempts.clone();
        move || {
            broker_attempts.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok::<_, PaymentJobError>(source.clone()))
        }
    };

    let result = service
        .run_with(
            refuse::<MockRecordStore>("PostgreSQL", store_attempts.clone()),
            connect_source,
            rx,
        )
        .await;

    assert!(matches!(
        result,
        Err(PaymentJobError::RetriesExhausted { attempts: 2, .. })
    ));
    assert_eq!(store_attempts.load(Ordering::SeqCst), 2);
    assert_eq!(broker_attempts.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_interrupts_connect_retries() {
    let mut config = worker_config("payments", 10);
    config.connect_retry = FixedBackoff::new(10, Duration::from_secs(5));
    let service = WorkerService::new(config);
    let store = MockRecordStore::new();
    let attempts = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = broadcast::channel(1);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(7)).await;
        let _ = tx.send(());
    });

    let start = tokio::time::Instant::now();
    let (reason, stats) = service
        .run_with(
            connect_to(&store),
            refuse::<MockMessageSource>("RabbitMQ", attempts.clone()),
            rx,
        )
        .await
        .unwrap();

    assert_eq!(reason, StopReason::Shutdown);
    assert_eq!(stats.acked, 0);
    // 第 0 秒、第 5 秒各尝试一次，第 7 秒收到关闭信号
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert!(start.elapsed() < Duration::from_secs(10));
    assert_eq!(store.close_calls(), 1);
}
