use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use k8s_openapi::api::batch::v1::Job;
use kube::{
    runtime::{controller::Action, watcher, Controller},
    Api, Client, ResourceExt,
};
use paymentjob_core::{config::OperatorConfig, models::PaymentJob, PaymentJobError, Result};
use paymentjob_infrastructure::{KubeEventPublisher, KubeStatusWriter, KubeWorkloadApi};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::reconciler::{sharp_delay, Trigger};
use crate::service::ReconcileService;
use crate::workload_builder::MANAGED_BY;

/// 协调函数共享的上下文
pub struct Context {
    pub service: ReconcileService,
    pub config: OperatorConfig,
}

/// 处理完成后的下一步: 删除后等待变化，其余按固定网格重新排队
pub fn next_action(trigger: Trigger, now: DateTime<Utc>, interval: Duration) -> Action {
    match trigger {
        Trigger::Delete => Action::await_change(),
        _ => Action::requeue(sharp_delay(now, interval)),
    }
}

async fn reconcile_payment_job(
    job: Arc<PaymentJob>,
    ctx: Arc<Context>,
) -> std::result::Result<Action, PaymentJobError> {
    let trigger = Trigger::detect(&job);
    ctx.service.handle(&job, trigger, Utc::now()).await?;
    Ok(next_action(
        trigger,
        Utc::now(),
        ctx.config.status_poll_interval(),
    ))
}

/// 冲突很快重试，其他错误按配置的间隔重试
pub fn error_policy(job: Arc<PaymentJob>, error: &PaymentJobError, ctx: Arc<Context>) -> Action {
    if error.is_conflict() {
        debug!("PaymentJob {} status 版本冲突，稍后重试", job.name_any());
        Action::requeue(ctx.config.conflict_requeue())
    } else {
        warn!("协调 PaymentJob {} 失败: {}", job.name_any(), error);
        Action::requeue(ctx.config.error_requeue())
    }
}

/// PaymentJob 控制器
pub struct PaymentJobController {
    client: Client,
    config: OperatorConfig,
}

impl PaymentJobController {
    pub const NAME: &'static str = MANAGED_BY;

    pub fn new(client: Client, config: OperatorConfig) -> Self {
        Self { client, config }
    }

    fn context(&self) -> Arc<Context> {
        let service = ReconcileService::new(
            Arc::new(KubeWorkloadApi::new(self.client.clone())),
            Arc::new(KubeStatusWriter::new(self.client.clone())),
            Arc::new(KubeEventPublisher::new(self.client.clone(), Self::NAME)),
        );
        Arc::new(Context {
            service,
            config: self.config.clone(),
        })
    }

    /// 运行直到收到关闭信号
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        let (payment_jobs, jobs): (Api<PaymentJob>, Api<Job>) = match &self.config.namespace {
            Some(namespace) => (
                Api::namespaced(self.client.clone(), namespace),
                Api::namespaced(self.client.clone(), namespace),
            ),
            None => (Api::all(self.client.clone()), Api::all(self.client.clone())),
        };

        info!(
            "PaymentJob operator 启动，监听范围: {}，状态轮询间隔: {:?}",
            self.config.namespace.as_deref().unwrap_or("所有命名空间"),
            self.config.status_poll_interval()
        );

        let context = self.context();
        let controller = Controller::new(payment_jobs, watcher::Config::default())
            .owns(
                jobs,
                watcher::Config::default().labels(&format!("managed-by={MANAGED_BY}")),
            )
            .run(reconcile_payment_job, error_policy, context)
            .for_each(|result| async move {
                match result {
                    Ok((object, _)) => debug!("协调完成: {}", object.name),
                    Err(e) => warn!("协调出错: {}", e),
                }
            });

        tokio::select! {
            _ = controller => {
                warn!("控制器事件流已结束");
            }
            _ = shutdown.recv() => {
                info!("收到关闭信号，停止 PaymentJob operator");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use paymentjob_testing_utils::{
        MockEventPublisher, MockStatusWriter, MockWorkloadApi, PaymentJobBuilder,
    };

    fn context() -> Arc<Context> {
        Arc::new(Context {
            service: ReconcileService::new(
                Arc::new(MockWorkloadApi::new()),
                Arc::new(MockStatusWriter::new()),
                Arc::new(MockEventPublisher::new()),
            ),
            config: OperatorConfig::default(),
        })
    }

    #[test]
    fn test_next_action_follows_sharp_grid() {
        let now = Utc.timestamp_millis_opt(1_000_004_000).unwrap();
        assert_eq!(
            next_action(Trigger::Timer, now, Duration::from_secs(10)),
            Action::requeue(Duration::from_secs(6))
        );
        assert_eq!(
            next_action(Trigger::Delete, now, Duration::from_secs(10)),
            Action::await_change()
        );
    }

    #[test]
    fn test_error_policy_requeues_conflicts_quickly() {
        let job = Arc::new(PaymentJobBuilder::new("checkout").build());

        let action = error_policy(
            job.clone(),
            &PaymentJobError::Conflict("stale resourceVersion".into()),
            context(),
        );
        assert_eq!(action, Action::requeue(Duration::from_secs(1)));

        let action = error_policy(job, &PaymentJobError::Internal("boom".into()), context());
        assert_eq!(action, Action::requeue(Duration::from_secs(15)));
    }
}
