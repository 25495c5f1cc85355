use anyhow::Result;
use paymentjob_core::{
    config::{BrokerConfig, DatabaseConfig},
    models::NewPaymentRecord,
    traits::{MessageSource, RecordStore},
};
use paymentjob_infrastructure::{PostgresRecordStore, RabbitMQConsumer, RabbitMQPublisher};
use serde_json::json;
use sqlx::Row;
use testcontainers::{runners::AsyncRunner, ContainerAsync, ImageExt};
use testcontainers_modules::{postgres::Postgres, rabbitmq::RabbitMq};
use tokio::time::{sleep, timeout, Duration};

async fn start_postgres() -> Result<(ContainerAsync<Postgres>, DatabaseConfig)> {
    let container = Postgres::default()
        .with_db_name("payments_test")
        .with_user("test_user")
        .with_password("test_password")
        .with_tag("16-alpine")
        .start()
        .await?;
    let port = container.get_host_port_ipv4(5432).await?;

    let config = DatabaseConfig {
        host: "localhost".to_string(),
        port,
        database: "payments_test".to_string(),
        username: "test_user".to_string(),
        password: "test_password".to_string(),
    };
    Ok((container, config))
}

async fn connect_store(config: &DatabaseConfig) -> Result<PostgresRecordStore> {
    let mut retry_count = 0;
    loop {
        match PostgresRecordStore::connect(config).await {
            Ok(store) => return Ok(store),
            Err(_) if retry_count < 30 => {
                retry_count += 1;
                sleep(Duration::from_millis(500)).await;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

#[tokio::test]
#[ignore] // 需要 Docker
async fn test_migrate_is_idempotent_and_insert_returns_ids() -> Result<()> {
    let (_container, config) = start_postgres().await?;
    let mut store = connect_store(&config).await?;

    store.migrate().await?;
    store.migrate().await?;

    let first = NewPaymentRecord::new(
        json!({"amount": 100, "currency": "USD"}),
        Some("msg-1".to_string()),
        "payments",
    );
    let second = NewPaymentRecord::new(json!({"amount": 5}), None, "payments");

    let first_id = store.insert(&first).await?;
    let second_id = store.insert(&second).await?;
    assert!(second_id > first_id);

    let row = sqlx::query("SELECT payload, message_id, source_queue FROM payments WHERE id = $1")
        .bind(first_id as i32)
        .fetch_one(store.pool())
        .await?;
    let payload: serde_json::Value = row.try_get("payload")?;
    let message_id: Option<String> = row.try_get("message_id")?;
    let source_queue: String = row.try_get("source_queue")?;
    assert_eq!(payload, json!({"amount": 100, "currency": "USD"}));
    assert_eq!(message_id.as_deref(), Some("msg-1"));
    assert_eq!(source_queue, "payments");

    store.close().await;
    Ok(())
}

#[tokio::test]
#[ignore] // 需要 Docker
async fn test_reconnect_restores_a_closed_pool() -> Result<()> {
    let (_container, config) = start_postgres().await?;
    let mut store = connect_store(&config).await?;
    store.migrate().await?;

    store.close().await;
    assert!(store
        .insert(&NewPaymentRecord::new(json!({}), None, "payments"))
        .await
        .is_err());

    store.reconnect().await?;
    let id = store
        .insert(&NewPaymentRecord::new(json!({"amount": 1}), None, "payments"))
        .await?;
    assert!(id > 0);
    Ok(())
}

#[tokio::test]
#[ignore] // 需要 Docker
async fn test_published_message_is_consumed_and_acked() -> Result<()> {
    let container = RabbitMq::default()
        .with_tag("3.12-management-alpine")
        .start()
        .await?;
    let port = container.get_host_port_ipv4(5672).await?;
    sleep(Duration::from_secs(5)).await;

    let broker = BrokerConfig {
        host: "localhost".to_string(),
        port,
        username: "guest".to_string(),
        password: "guest".to_string(),
        heartbeat_seconds: 600,
    };

    let publisher = RabbitMQPublisher::connect(&broker).await?;
    publisher.declare_queue("payments").await?;
    publisher
        .publish_json("payments", &json!({"amount": 42}), "msg-42")
        .await?;
    publisher.close().await?;

    let mut consumer = RabbitMQConsumer::connect(&broker, "payments", "integration-test").await?;
    let message = timeout(Duration::from_secs(10), consumer.next_message())
        .await??
        .expect("队列中应该有一条消息");

    assert_eq!(message.message_id.as_deref(), Some("msg-42"));
    assert_eq!(message.parse_payload()?, json!({"amount": 42}));

    consumer.ack(message.delivery_tag).await?;
    consumer.close().await?;
    Ok(())
}
