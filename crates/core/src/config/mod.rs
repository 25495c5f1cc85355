pub mod operator;
pub mod worker;

pub use operator::OperatorConfig;
pub use worker::{env_keys, BrokerConfig, DatabaseConfig, WorkerConfig};
