use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;

use crate::{
    models::{JobEvent, PaymentJob, StatusPatch, WorkloadStatus},
    Result,
};

/// 集群中 Job 的读取与创建
#[async_trait]
pub trait WorkloadApi: Send + Sync {
    /// 读取 Job 状态；不存在时返回 `Ok(None)`
    async fn get_status(&self, namespace: &str, name: &str) -> Result<Option<WorkloadStatus>>;

    /// 创建 Job
    async fn create(&self, namespace: &str, job: &Job) -> Result<()>;
}

/// PaymentJob status 子资源写入
#[async_trait]
pub trait StatusWriter: Send + Sync {
    async fn patch_status(&self, namespace: &str, name: &str, patch: &StatusPatch) -> Result<()>;
}

/// Kubernetes Event 发布
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, job: &PaymentJob, event: &JobEvent) -> Result<()>;
}
