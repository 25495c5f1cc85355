//! 支付消息 worker
//!
//! 从 RabbitMQ 队列逐条消费支付消息，在事务中写入 PostgreSQL 后再确认。

pub mod connection_manager;
pub mod pipeline;
pub mod service;

pub use connection_manager::connect_with_retry;
pub use pipeline::{run_pipeline, DeliveryPipeline, Disposition, PipelineStats, StopReason};
pub use service::WorkerService;
