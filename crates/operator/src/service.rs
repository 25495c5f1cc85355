use std::sync::Arc;

use chrono::{DateTime, Utc};
use paymentjob_core::{
    models::PaymentJob,
    traits::{EventPublisher, StatusWriter, WorkloadApi},
    Result,
};
use tracing::{debug, info, instrument, warn};

use crate::reconciler::{
    creation_outcome, identity, reconcile, resolve_workload_name, Decision, Observed, Trigger,
};

/// 读取观测状态、调用 [`reconcile`] 并执行其结果
pub struct ReconcileService {
    workloads: Arc<dyn WorkloadApi>,
    status_writer: Arc<dyn StatusWriter>,
    events: Arc<dyn EventPublisher>,
}

impl ReconcileService {
    pub fn new(
        workloads: Arc<dyn WorkloadApi>,
        status_writer: Arc<dyn StatusWriter>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            workloads,
            status_writer,
            events,
        }
    }

    #[instrument(skip_all, fields(
        paymentjob = ?job.metadata.name,
        namespace = ?job.metadata.namespace,
        trigger = ?trigger,
    ))]
    pub async fn handle(&self, job: &PaymentJob, trigger: Trigger, now: DateTime<Utc>) -> Result<()> {
        let (name, namespace) = identity(job)?;

        match trigger {
            Trigger::Delete => {
                info!("PaymentJob {}/{} 已删除，Job 由垃圾回收清理", namespace, name);
            }
            Trigger::Update => {
                warn!(
                    "PaymentJob {}/{} 的 spec 被修改，不支持原地更新，请删除后重建",
                    namespace, name
                );
            }
            _ => {}
        }

        let observed = match trigger {
            Trigger::Create | Trigger::Timer => {
                let workload = resolve_workload_name(job)?;
                Observed {
                    workload: self.workloads.get_status(namespace, &workload).await?,
                }
            }
            Trigger::Update | Trigger::Delete => Observed::missing(),
        };

        let mut decision = reconcile(trigger, job, &observed, now)?;

        if let Some(workload) = decision.create.take() {
            let workload_name = workload.metadata.name.clone().unwrap_or_default();
            let outcome = match self.workloads.create(namespace, &workload).await {
                Ok(()) => {
                    info!("已创建 Job: {}/{}", namespace, workload_name);
                    Ok(())
                }
                // 并发创建，交给下一轮协调同步状态
                Err(e) if e.is_conflict() => return Err(e),
                Err(e) => {
                    warn!("创建 Job {}/{} 失败: {}", namespace, workload_name, e);
                    Err(e.reason())
                }
            };
            decision = creation_outcome(job, &workload_name, outcome, now);
        }

        self.apply(job, namespace, name, decision).await
    }

    async fn apply(
        &self,
        job: &PaymentJob,
        namespace: &str,
        name: &str,
        decision: Decision,
    ) -> Result<()> {
        if let Some(patch) = &decision.status_patch {
            self.status_writer.patch_status(namespace, name, patch).await?;
            match patch.phase {
                Some(phase) => info!("PaymentJob {}/{} 阶段更新为 {}", namespace, name, phase),
                None => debug!("PaymentJob {}/{} status 已更新", namespace, name),
            }
        }

        for event in &decision.events {
            if let Err(e) = self.events.publish(job, event).await {
                warn!("发布事件 {} 失败: {}", event.reason, e);
            }
        }
        Ok(())
    }
}
