use std::time::Duration;

use async_trait::async_trait;

/// 连接重试策略
#[async_trait]
pub trait BackoffPolicy: Send + Sync {
    /// 总尝试次数（含第一次）
    fn max_attempts(&self) -> u32;

    /// 第 `attempt` 次失败后、下一次尝试前的等待时长
    fn delay(&self, attempt: u32) -> Duration;

    async fn wait(&self, attempt: u32) {
        let delay = self.delay(attempt);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// 固定次数、固定间隔
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedBackoff {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl FixedBackoff {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
    pub const DEFAULT_DELAY_SECONDS: u64 = 5;

    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// 不等待，测试中模拟重试耗尽
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }
}

impl Default for FixedBackoff {
    fn default() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            delay: Duration::from_secs(Self::DEFAULT_DELAY_SECONDS),
        }
    }
}

#[async_trait]
impl BackoffPolicy for FixedBackoff {
    fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn delay(&self, _attempt: u32) -> Duration {
        self.delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = FixedBackoff::default();
        assert_eq!(policy.max_attempts(), 10);
        assert_eq!(policy.delay(1), Duration::from_secs(5));
        assert_eq!(policy.delay(9), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_sleeps_fixed_delay() {
        let policy = FixedBackoff::new(3, Duration::from_secs(5));
        let started = tokio::time::Instant::now();
        policy.wait(1).await;
        assert!(started.elapsed() >= Duration::from_secs(5));
    }
}
