//! Test helper utilities and common testing patterns

use chrono::{DateTime, TimeZone, Utc};
use paymentjob_core::{
    config::{BrokerConfig, DatabaseConfig, WorkerConfig},
    FixedBackoff,
};
use std::time::Duration;
use tokio::time::sleep;

/// Test environment setup utilities
pub struct TestEnv;

impl TestEnv {
    /// Wait for a condition to be true with timeout
    pub async fn wait_for<F, Fut>(mut condition: F, timeout: Duration) -> bool
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        let start = std::time::Instant::now();

        while start.elapsed() < timeout {
            if condition().await {
                return true;
            }
            sleep(Duration::from_millis(10)).await;
        }

        false
    }
}

/// Fixed clock for reconcile tests: 2026-03-09 at the given time of day
pub fn clock(hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 9, hour, minute, second)
        .single()
        .unwrap_or_else(Utc::now)
}

/// A payment message body like the ones upstream services publish
pub fn payment_payload(amount: u64, currency: &str) -> serde_json::Value {
    serde_json::json!({
        "amount": amount,
        "currency": currency,
        "customer_id": format!("cust-{amount}"),
    })
}

/// Worker settings for a local broker and database; connects retry without waiting
pub fn worker_config(queue_name: &str, max_attempts: u32) -> WorkerConfig {
    WorkerConfig {
        queue_name: queue_name.to_string(),
        broker: BrokerConfig {
            host: "localhost".to_string(),
            port: 5672,
            username: "guest".to_string(),
            password: "guest".to_string(),
            heartbeat_seconds: BrokerConfig::DEFAULT_HEARTBEAT_SECONDS,
        },
        database: DatabaseConfig {
            host: "localhost".to_string(),
            port: 5432,
            database: "payments_db".to_string(),
            username: "postgres".to_string(),
            password: "postgres".to_string(),
        },
        max_messages: None,
        connect_retry: FixedBackoff::immediate(max_attempts),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_wait_for_success() {
        let mut counter = 0;
        let condition = || {
            counter += 1;
            async move { counter >= 3 }
        };

        assert!(TestEnv::wait_for(condition, Duration::from_millis(500)).await);
    }

    #[tokio::test]
    async fn test_wait_for_timeout() {
        let condition = || async { false };
        assert!(!TestEnv::wait_for(condition, Duration::from_millis(50)).await);
    }

    #[test]
    fn test_clock_is_deterministic() {
        assert_eq!(clock(7, 5, 1).to_rfc3339(), "2026-03-09T07:05:01+00:00");
    }
}
