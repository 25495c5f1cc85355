use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use kube::{
    api::{Patch, PatchParams, PostParams},
    runtime::events::{Event, EventType, Recorder, Reporter},
    Api, Client, Resource,
};
use paymentjob_core::{
    models::{JobEvent, JobEventType, PaymentJob, StatusPatch, WorkloadStatus},
    traits::{EventPublisher, StatusWriter, WorkloadApi},
    PaymentJobError, Result,
};
use tracing::{debug, instrument};

/// 基于 kube client 的 Job 读写
#[derive(Clone)]
pub struct KubeWorkloadApi {
    client: Client,
}

impl KubeWorkloadApi {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl WorkloadApi for KubeWorkloadApi {
    #[instrument(skip(self))]
    async fn get_status(&self, namespace: &str, name: &str) -> Result<Option<WorkloadStatus>> {
        let api: Api<Job> = Api::namespaced(self.client.clone(), namespace);
        match api.get_opt(name).await? {
            Some(job) => Ok(Some(
                job.status
                    .as_ref()
                    .map(WorkloadStatus::from)
                    .unwrap_or_default(),
            )),
            None => {
                debug!("Job {}/{} 不存在", namespace, name);
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, job), fields(job = ?job.metadata.name))]
    async fn create(&self, namespace: &str, job: &Job) -> Result<()> {
        let api: Api<Job> = Api::namespaced(self.client.clone(), namespace);
        api.create(&PostParams::default(), job).await?;
        Ok(())
    }
}

/// PaymentJob status 子资源的 merge patch 写入
#[derive(Clone)]
pub struct KubeStatusWriter {
    client: Client,
}

impl KubeStatusWriter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StatusWriter for KubeStatusWriter {
    #[instrument(skip(self, patch))]
    async fn patch_status(&self, namespace: &str, name: &str, patch: &StatusPatch) -> Result<()> {
        let api: Api<PaymentJob> = Api::namespaced(self.client.clone(), namespace);
        api.patch_status(name, &PatchParams::default(), &Patch::Merge(patch.to_merge_patch()))
            .await
            .map_err(|e| match e {
                kube::Error::Api(response) if response.code == 409 => {
                    PaymentJobError::Conflict(response.message)
                }
                other => PaymentJobError::Kube(other),
            })?;
        Ok(())
    }
}

/// 通过 events.k8s.io 发布事件
#[derive(Clone)]
pub struct KubeEventPublisher {
    recorder: Recorder,
}

impl KubeEventPublisher {
    pub fn new(client: Client, controller: &str) -> Self {
        let reporter = Reporter {
            controller: controller.to_string(),
            instance: hostname::get()
                .ok()
                .and_then(|name| name.into_string().ok()),
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait]
impl EventPublisher for KubeEventPublisher {
    async fn publish(&self, job: &PaymentJob, event: &JobEvent) -> Result<()> {
        let reference = job.object_ref(&());
        self.recorder
            .publish(
                &Event {
                    type_: match event.event_type {
                        JobEventType::Normal => EventType::Normal,
                        JobEventType::Warning => EventType::Warning,
                    },
                    reason: event.reason.clone(),
                    note: Some(event.note.clone()),
                    action: "Reconcile".to_string(),
                    secondary: None,
                },
                &reference,
            )
            .await?;
        Ok(())
    }
}
