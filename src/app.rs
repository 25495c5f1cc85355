use anyhow::{Context, Result};
use paymentjob_core::config::{OperatorConfig, WorkerConfig};
use paymentjob_operator::PaymentJobController;
use paymentjob_worker::{StopReason, WorkerService};
use tokio::sync::broadcast;
use tracing::info;

/// 运行模式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppMode {
    Operator { config_path: Option<String> },
    Worker,
}

pub struct Application {
    mode: AppMode,
}

impl Application {
    pub fn new(mode: AppMode) -> Self {
        Self { mode }
    }

    pub async fn run(&self, shutdown: broadcast::Receiver<()>) -> Result<()> {
        match &self.mode {
            AppMode::Operator { config_path } => run_operator(config_path.as_deref(), shutdown).await,
            AppMode::Worker => run_worker(shutdown).await,
        }
    }
}

async fn run_operator(config_path: Option<&str>, shutdown: broadcast::Receiver<()>) -> Result<()> {
    let config = OperatorConfig::load(config_path).context("加载operator配置失败")?;
    let client = kube::Client::try_default()
        .await
        .context("创建Kubernetes客户端失败")?;

    PaymentJobController::new(client, config)
        .run(shutdown)
        .await
        .context("PaymentJob operator 运行失败")?;
    Ok(())
}

async fn run_worker(shutdown: broadcast::Receiver<()>) -> Result<()> {
    let config = WorkerConfig::from_env().context("读取worker配置失败")?;
    let (reason, stats) = WorkerService::new(config)
        .run(shutdown)
        .await
        .context("worker运行失败")?;

    match reason {
        StopReason::CapReached => info!("达到处理上限，worker 退出"),
        StopReason::Shutdown => info!("worker 已优雅关闭"),
        StopReason::SourceClosed => info!("消费者被关闭，worker 退出"),
    }
    info!("共处理 {} 条消息", stats.acked);
    Ok(())
}
