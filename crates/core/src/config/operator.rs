use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{PaymentJobError, Result};

/// operator 配置
///
/// 来源优先级: 环境变量 `PAYMENTJOB_OPERATOR__*` > 配置文件 > 默认值。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorConfig {
    /// 只监听该命名空间；为空时监听全部命名空间
    pub namespace: Option<String>,
    /// Job 状态轮询周期（秒）
    pub status_poll_interval_seconds: u64,
    /// 调谐出错后的重新入队延迟（秒）
    pub error_requeue_seconds: u64,
    /// status 写入版本冲突后的重新入队延迟（秒）
    pub conflict_requeue_seconds: u64,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            status_poll_interval_seconds: 10,
            error_requeue_seconds: 15,
            conflict_requeue_seconds: 1,
        }
    }
}

impl OperatorConfig {
    pub const ENV_PREFIX: &'static str = "PAYMENTJOB_OPERATOR";

    /// 加载配置，`path` 为可选的 TOML 文件
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(
                config::File::new(path, config::FileFormat::Toml).required(true),
            );
        }
        builder = builder.add_source(
            config::Environment::with_prefix(Self::ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config: OperatorConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| PaymentJobError::Configuration(format!("加载operator配置失败: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if self.status_poll_interval_seconds == 0 {
            return Err(PaymentJobError::Configuration(
                "状态轮询周期必须大于0".to_string(),
            ));
        }

        if self.error_requeue_seconds == 0 {
            return Err(PaymentJobError::Configuration(
                "错误重试延迟必须大于0".to_string(),
            ));
        }

        if self.conflict_requeue_seconds == 0 {
            return Err(PaymentJobError::Configuration(
                "冲突重试延迟必须大于0".to_string(),
            ));
        }

        if matches!(&self.namespace, Some(ns) if ns.trim().is_empty()) {
            return Err(PaymentJobError::Configuration(
                "命名空间不能为空字符串".to_string(),
            ));
        }

        Ok(())
    }

    pub fn status_poll_interval(&self) -> Duration {
        Duration::from_secs(self.status_poll_interval_seconds)
    }

    pub fn error_requeue(&self) -> Duration {
        Duration::from_secs(self.error_requeue_seconds)
    }

    pub fn conflict_requeue(&self) -> Duration {
        Duration::from_secs(self.conflict_requeue_seconds)
    }
}
