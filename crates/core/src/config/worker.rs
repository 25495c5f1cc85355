use std::fmt;
use std::time::Duration;

use crate::{
    models::{DEFAULT_BROKER_PORT, DEFAULT_DATABASE_PORT},
    retry::FixedBackoff,
    PaymentJobError, Result,
};

/// worker 进程读取的环境变量名，operator 构建 Job 时使用同一组名称
pub mod env_keys {
    pub const QUEUE_NAME: &str = "QUEUE_NAME";
    pub const RABBITMQ_HOST: &str = "RABBITMQ_HOST";
    pub const RABBITMQ_PORT: &str = "RABBITMQ_PORT";
    pub const RABBITMQ_USER: &str = "RABBITMQ_USER";
    pub const RABBITMQ_PASS: &str = "RABBITMQ_PASS";
    pub const POSTGRES_HOST: &str = "POSTGRES_HOST";
    pub const POSTGRES_PORT: &str = "POSTGRES_PORT";
    pub const POSTGRES_DB: &str = "POSTGRES_DB";
    pub const POSTGRES_USER: &str = "POSTGRES_USER";
    pub const POSTGRES_PASS: &str = "POSTGRES_PASS";
    pub const MAX_MESSAGES: &str = "MAX_MESSAGES";
    pub const CONNECT_MAX_ATTEMPTS: &str = "CONNECT_MAX_ATTEMPTS";
    pub const CONNECT_RETRY_DELAY_SECONDS: &str = "CONNECT_RETRY_DELAY_SECONDS";
}

/// RabbitMQ 连接参数
#[derive(Clone, PartialEq, Eq)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub heartbeat_seconds: u16,
}

impl BrokerConfig {
    pub const DEFAULT_HEARTBEAT_SECONDS: u16 = 600;
}

impl fmt::Debug for BrokerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("heartbeat_seconds", &self.heartbeat_seconds)
            .finish()
    }
}

/// PostgreSQL 连接参数
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// worker 的不可变配置，启动时构建一次
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    pub queue_name: String,
    pub broker: BrokerConfig,
    pub database: DatabaseConfig,
    /// 处理上限；`None` 表示不限
    pub max_messages: Option<u64>,
    pub connect_retry: FixedBackoff,
}

impl WorkerConfig {
    /// 从进程环境变量读取
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意键值来源读取，缺少必填项时返回配置错误
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| {
                PaymentJobError::Configuration(format!("必需的环境变量 {key} 未设置"))
            })
        };

        let max_messages = match get(env_keys::MAX_MESSAGES) {
            // 0 与未设置等价
            Some(raw) => Some(parse_number::<u64>(env_keys::MAX_MESSAGES, &raw)?).filter(|n| *n > 0),
            None => None,
        };

        let mut connect_retry = FixedBackoff::default();
        if let Some(raw) = get(env_keys::CONNECT_MAX_ATTEMPTS) {
            connect_retry.max_attempts = parse_number(env_keys::CONNECT_MAX_ATTEMPTS, &raw)?;
        }
        if let Some(raw) = get(env_keys::CONNECT_RETRY_DELAY_SECONDS) {
            connect_retry.delay =
                Duration::from_secs(parse_number(env_keys::CONNECT_RETRY_DELAY_SECONDS, &raw)?);
        }

        let config = Self {
            queue_name: required(env_keys::QUEUE_NAME)?,
            broker: BrokerConfig {
                host: required(env_keys::RABBITMQ_HOST)?,
                port: match get(env_keys::RABBITMQ_PORT) {
                    Some(raw) => parse_number(env_keys::RABBITMQ_PORT, &raw)?,
                    None => DEFAULT_BROKER_PORT,
                },
                username: required(env_keys::RABBITMQ_USER)?,
                password: required(env_keys::RABBITMQ_PASS)?,
                heartbeat_seconds: BrokerConfig::DEFAULT_HEARTBEAT_SECONDS,
            },
            database: DatabaseConfig {
                host: required(env_keys::POSTGRES_HOST)?,
                port: match get(env_keys::POSTGRES_PORT) {
                    Some(raw) => parse_number(env_keys::POSTGRES_PORT, &raw)?,
                    None => DEFAULT_DATABASE_PORT,
                },
                database: required(env_keys::POSTGRES_DB)?,
                username: required(env_keys::POSTGRES_USER)?,
                password: required(env_keys::POSTGRES_PASS)?,
            },
            max_messages,
            connect_retry,
        };

        config.validate()?;
        Ok(config)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if self.broker.port == 0 {
            return Err(PaymentJobError::Configuration(
                "RabbitMQ端口必须大于0".to_string(),
            ));
        }

        if self.database.port == 0 {
            return Err(PaymentJobError::Configuration(
                "PostgreSQL端口必须大于0".to_string(),
            ));
        }

        if self.connect_retry.max_attempts == 0 {
            return Err(PaymentJobError::Configuration(
                "连接重试次数必须大于0".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_number<T>(key: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| {
        PaymentJobError::Configuration(format!("环境变量 {key} 的值 {raw:?} 无效: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn full_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            (env_keys::QUEUE_NAME, "payments"),
            (env_keys::RABBITMQ_HOST, "rabbitmq.billing.svc"),
            (env_keys::RABBITMQ_USER, "worker"),
            (env_keys::RABBITMQ_PASS, "s3cret-rabbit"),
            (env_keys::POSTGRES_HOST, "postgres.billing.svc"),
            (env_keys::POSTGRES_DB, "payments_db"),
            (env_keys::POSTGRES_USER, "payments"),
            (env_keys::POSTGRES_PASS, "s3cret-pg"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> Result<WorkerConfig> {
        WorkerConfig::from_lookup(|key| env.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn test_defaults_applied() {
        let config = load(&full_env()).unwrap();
        assert_eq!(config.queue_name, "payments");
        assert_eq!(config.broker.port, 5672);
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.max_messages, None);
        assert_eq!(config.connect_retry, FixedBackoff::default());
    }

    #[test]
    fn test_missing_required_value_is_error() {
        for key in [
            env_keys::QUEUE_NAME,
            env_keys::RABBITMQ_HOST,
            env_keys::RABBITMQ_PASS,
            env_keys::POSTGRES_DB,
            env_keys::POSTGRES_USER,
        ] {
            let mut env = full_env();
            env.remove(key);
            let err = load(&env).unwrap_err();
            assert!(err.to_string().contains(key), "{key}: {err}");
        }
    }

    #[test]
    fn test_blank_required_value_is_error() {
        let mut env = full_env();
        env.insert(env_keys::QUEUE_NAME, "  ");
        assert!(load(&env).is_err());
    }

    #[test]
    fn test_optional_overrides() {
        let mut env = full_env();
        env.insert(env_keys::RABBITMQ_PORT, "5673");
        env.insert(env_keys::POSTGRES_PORT, "6432");
        env.insert(env_keys::MAX_MESSAGES, "25");
        env.insert(env_keys::CONNECT_MAX_ATTEMPTS, "3");
        env.insert(env_keys::CONNECT_RETRY_DELAY_SECONDS, "0");

        let config = load(&env).unwrap();
        assert_eq!(config.broker.port, 5673);
        assert_eq!(config.database.port, 6432);
        assert_eq!(config.max_messages, Some(25));
        assert_eq!(config.connect_retry, FixedBackoff::immediate(3));
    }

    #[test]
    fn test_zero_cap_means_unlimited() {
        let mut env = full_env();
        env.insert(env_keys::MAX_MESSAGES, "0");
        assert_eq!(load(&env).unwrap().max_messages, None);
    }

    #[test]
    fn test_malformed_number_is_error() {
        let mut env = full_env();
        env.insert(env_keys::RABBITMQ_PORT, "amqp");
        assert!(matches!(load(&env), Err(PaymentJobError::Configuration(_))));

        let mut env = full_env();
        env.insert(env_keys::MAX_MESSAGES, "-1");
        assert!(load(&env).is_err());
    }

    #[test]
    fn test_debug_redacts_passwords() {
        let config = load(&full_env()).unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("s3cret-rabbit"));
        assert!(!rendered.contains("s3cret-pg"));
        assert!(rendered.contains("<redacted>"));
    }
}
