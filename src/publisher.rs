//! 向队列发布测试支付消息

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use paymentjob_core::config::{env_keys, BrokerConfig};
use paymentjob_core::models::DEFAULT_BROKER_PORT;
use paymentjob_infrastructure::RabbitMQPublisher;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

const PAYMENT_METHODS: [&str; 5] = ["credit_card", "debit_card", "pix", "boleto", "transfer"];
const CURRENCIES: [&str; 3] = ["BRL", "USD", "EUR"];
const STATUSES: [&str; 3] = ["pending", "approved", "processing"];

/// 发布参数；命令行优先，其次环境变量，最后默认值
#[derive(Debug, Clone)]
pub struct PublishOptions {
    pub count: u64,
    pub queue_name: String,
    pub broker: BrokerConfig,
}

impl PublishOptions {
    pub fn resolve<F>(
        count: u64,
        queue: Option<String>,
        host: Option<String>,
        port: Option<u16>,
        lookup: F,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let port = match port {
            Some(port) => port,
            None => match lookup(env_keys::RABBITMQ_PORT) {
                Some(raw) => raw
                    .parse()
                    .with_context(|| format!("{} 的值 {raw:?} 无效", env_keys::RABBITMQ_PORT))?,
                None => DEFAULT_BROKER_PORT,
            },
        };

        Ok(Self {
            count,
            queue_name: queue.unwrap_or_else(|| env_or(env_keys::QUEUE_NAME, "payments")),
            broker: BrokerConfig {
                host: host.unwrap_or_else(|| env_or(env_keys::RABBITMQ_HOST, "localhost")),
                port,
                username: env_or(env_keys::RABBITMQ_USER, "guest"),
                password: env_or(env_keys::RABBITMQ_PASS, "guest"),
                heartbeat_seconds: BrokerConfig::DEFAULT_HEARTBEAT_SECONDS,
            },
        })
    }
}

/// 第 `index` 条测试支付，除 `transaction_id` 与时间外由序号决定
pub fn test_payment(index: u64, transaction_id: Uuid, now: DateTime<Utc>) -> Value {
    let i = index as usize;
    let amount = ((10.0 + (index as f64 * 7.5) % 1000.0) * 100.0).round() / 100.0;
    let timestamp = now.format("%Y-%m-%dT%H:%M:%S%.6f").to_string();

    json!({
        "transaction_id": transaction_id.to_string(),
        "order_id": format!("ORD-{index:06}"),
        "customer": {
            "id": format!("CUST-{:04}", index % 100),
            "name": format!("Customer {index}"),
            "email": format!("customer{index}@example.com"),
        },
        "amount": amount,
        "currency": CURRENCIES[i % CURRENCIES.len()],
        "payment_method": PAYMENT_METHODS[i % PAYMENT_METHODS.len()],
        "status": STATUSES[i % STATUSES.len()],
        "metadata": {
            "source": "test_script",
            "test_index": index,
            "generated_at": timestamp,
        },
        "created_at": timestamp,
    })
}

/// 声明队列并发布 `count` 条持久化消息，返回成功发布的条数
pub async fn publish_test_messages(options: &PublishOptions) -> Result<u64> {
    info!("RabbitMQ: {}:{}", options.broker.host, options.broker.port);
    info!("队列: {}", options.queue_name);
    info!("消息数量: {}", options.count);

    let publisher = RabbitMQPublisher::connect(&options.broker)
        .await
        .context("连接RabbitMQ失败")?;
    publisher
        .declare_queue(&options.queue_name)
        .await
        .context("声明队列失败")?;

    let mut published = 0;
    for index in 1..=options.count {
        let payload = test_payment(index, Uuid::new_v4(), Utc::now());
        let message_id = Uuid::new_v4().to_string();
        match publisher
            .publish_json(&options.queue_name, &payload, &message_id)
            .await
        {
            Ok(()) => {
                published += 1;
                info!(
                    "[{}/{}] 已发布 {} ({} {})",
                    index, options.count, payload["order_id"], payload["amount"], payload["currency"]
                );
            }
            Err(e) => warn!("[{}/{}] 发布失败: {}", index, options.count, e),
        }
    }

    publisher.close().await.context("关闭RabbitMQ连接失败")?;
    info!("完成: 已发布 {}/{} 条消息", published, options.count);
    Ok(published)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;

    #[test]
    fn test_payment_fields_follow_index() {
        let now = Utc.with_ymd_and_hms(2026, 3, 9, 7, 5, 1).unwrap();
        let payment = test_payment(1, Uuid::nil(), now);

        assert_eq!(payment["order_id"], "ORD-000001");
        assert_eq!(payment["customer"]["id"], "CUST-0001");
        assert_eq!(payment["customer"]["email"], "customer1@example.com");
        assert_eq!(payment["amount"], 17.5);
        assert_eq!(payment["currency"], "USD");
        assert_eq!(payment["payment_method"], "debit_card");
        assert_eq!(payment["status"], "approved");
        assert_eq!(payment["metadata"]["test_index"], 1);
        assert_eq!(payment["created_at"], "2026-03-09T07:05:01.000000");
    }

    #[test]
    fn test_amount_wraps_at_one_thousand() {
        let now = Utc::now();
        assert_eq!(test_payment(200, Uuid::nil(), now)["amount"], 510.0);
        assert_eq!(test_payment(134, Uuid::nil(), now)["amount"], 15.0);
    }

    #[test]
    fn test_options_resolution_order() {
        let env = HashMap::from([
            ("QUEUE_NAME", "env-queue"),
            ("RABBITMQ_HOST", "env-host"),
            ("RABBITMQ_PORT", "5673"),
        ]);
        let lookup = |key: &str| env.get(key).map(|v| v.to_string());

        let options = PublishOptions::resolve(5, None, None, None, lookup).unwrap();
        assert_eq!(options.queue_name, "env-queue");
        assert_eq!(options.broker.host, "env-host");
        assert_eq!(options.broker.port, 5673);
        assert_eq!(options.broker.username, "guest");

        let options = PublishOptions::resolve(
            5,
            Some("cli-queue".into()),
            Some("cli-host".into()),
            Some(5680),
            lookup,
        )
        .unwrap();
        assert_eq!(options.queue_name, "cli-queue");
        assert_eq!(options.broker.host, "cli-host");
        assert_eq!(options.broker.port, 5680);
    }

    #[test]
    fn test_options_reject_bad_port() {
        let result = PublishOptions::resolve(1, None, None, None, |key| {
            (key == "RABBITMQ_PORT").then(|| "amqp".to_string())
        });
        assert!(result.is_err());
    }
}
