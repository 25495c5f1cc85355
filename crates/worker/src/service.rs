use std::future::Future;

use paymentjob_core::{
    config::WorkerConfig,
    traits::{MessageSource, RecordStore},
    Result,
};
use paymentjob_infrastructure::{PostgresRecordStore, RabbitMQConsumer};
use tokio::sync::broadcast;
use tracing::info;

use crate::connection_manager::connect_with_retry;
use crate::pipeline::{run_pipeline, PipelineStats, StopReason};

/// 支付消息 worker：RabbitMQ → PostgreSQL
pub struct WorkerService {
    config: WorkerConfig,
    consumer_tag: String,
}

impl WorkerService {
    pub fn new(config: WorkerConfig) -> Self {
        let host = hostname::get()
            .ok()
            .and_then(|name| name.into_string().ok())
            .unwrap_or_else(|| "unknown".to_string());
        Self {
            config,
            consumer_tag: format!("payment-worker-{host}"),
        }
    }

    fn log_banner(&self) {
        let config = &self.config;
        info!("支付消息 worker 启动");
        info!("  队列: {}", config.queue_name);
        info!("  RabbitMQ: {}:{}", config.broker.host, config.broker.port);
        info!(
            "  PostgreSQL: {}:{}/{}",
            config.database.host, config.database.port, config.database.database
        );
        match config.max_messages {
            Some(max) => info!("  处理上限: {} 条", max),
            None => info!("  处理上限: 不限"),
        }
    }

    /// 连接 PostgreSQL 与 RabbitMQ 并运行流水线，直到达到上限或收到关闭信号
    pub async fn run(&self, shutdown: broadcast::Receiver<()>) -> Result<(StopReason, PipelineStats)> {
        let config = &self.config;
        self.run_with(
            || PostgresRecordStore::connect(&config.database),
            || RabbitMQConsumer::connect(&config.broker, &config.queue_name, &self.consumer_tag),
            shutdown,
        )
        .await
    }

    /// 启动流程: 连接存储 → 建表 → 连接队列 → 消费
    ///
    /// 连接阶段同样响应关闭信号；任何一步失败都会释放已建立的连接。
    pub async fn run_with<R, S, FR, FutR, FS, FutS>(
        &self,
        connect_store: FR,
        connect_source: FS,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(StopReason, PipelineStats)>
    where
        R: RecordStore,
        S: MessageSource,
        FR: FnMut() -> FutR,
        FutR: Future<Output = Result<R>>,
        FS: FnMut() -> FutS,
        FutS: Future<Output = Result<S>>,
    {
        self.log_banner();
        let config = &self.config;

        let mut store = tokio::select! {
            store = connect_with_retry("PostgreSQL", &config.connect_retry, connect_store) => store?,
            _ = shutdown.recv() => {
                info!("连接 PostgreSQL 期间收到关闭信号");
                return Ok((StopReason::Shutdown, PipelineStats::default()));
            }
        };

        if let Err(e) = store.migrate().await {
            store.close().await;
            return Err(e);
        }

        let source = tokio::select! {
            source = connect_with_retry("RabbitMQ", &config.connect_retry, connect_source) => source,
            _ = shutdown.recv() => {
                info!("连接 RabbitMQ 期间收到关闭信号");
                store.close().await;
                return Ok((StopReason::Shutdown, PipelineStats::default()));
            }
        };
        let source = match source {
            Ok(source) => source,
            Err(e) => {
                store.close().await;
                return Err(e);
            }
        };

        info!("开始消费队列 {}", config.queue_name);
        run_pipeline(
            source,
            store,
            &config.queue_name,
            config.max_messages,
            shutdown,
        )
        .await
    }
}
