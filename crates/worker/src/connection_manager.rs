use std::future::Future;

use paymentjob_core::{BackoffPolicy, PaymentJobError, Result};
use tracing::{info, warn};

/// 按重试策略建立连接
///
/// 每次尝试都会记录日志；用尽次数后返回 [`PaymentJobError::RetriesExhausted`]。
pub async fn connect_with_retry<T, F, Fut>(
    target: &str,
    policy: &dyn BackoffPolicy,
    mut connect: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts().max(1);
    let mut last_error = String::new();

    for attempt in 1..=max_attempts {
        info!("连接 {} (第 {}/{} 次尝试)", target, attempt, max_attempts);
        match connect().await {
            Ok(connection) => {
                info!("{} 连接成功", target);
                return Ok(connection);
            }
            Err(e) => {
                warn!(
                    "连接 {} 失败 (第 {}/{} 次): {}",
                    target, attempt, max_attempts, e
                );
                last_error = e.to_string();
                if attempt < max_attempts {
                    policy.wait(attempt).await;
                }
            }
        }
    }

    Err(PaymentJobError::RetriesExhausted {
        target: target.to_string(),
        attempts: max_attempts,
        last_error,
    })
}
