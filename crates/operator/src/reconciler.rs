//! PaymentJob 协调状态机
//!
//! `reconcile` 是纯函数: 输入触发类型、期望状态（资源本身）、观测状态（Job 状态）和当前时间，
//! 输出要执行的动作、status 修改和事件。I/O 全部在 [`crate::service::ReconcileService`] 中完成。

use std::time::Duration;

use chrono::{DateTime, Utc};
use k8s_openapi::api::batch::v1::Job;
use paymentjob_core::{
    models::{
        format_timestamp, JobEvent, OwnerIdentity, PaymentJob, PaymentJobStatus, Phase,
        StatusPatch, WorkloadStatus,
    },
    PaymentJobError, Result,
};
use tracing::debug;

use crate::phase_deriver::derive_phase;
use crate::workload_builder::{build_job, workload_name};

pub const UPDATE_IGNORED_MESSAGE: &str =
    "Spec updates are not applied to running Jobs. Delete and recreate.";

pub mod reasons {
    pub const JOB_CREATED: &str = "JobCreated";
    pub const JOB_CREATION_FAILED: &str = "JobCreationFailed";
    pub const JOB_SUCCEEDED: &str = "JobSucceeded";
    pub const JOB_FAILED: &str = "JobFailed";
}

/// 触发协调的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Create,
    Update,
    Delete,
    Timer,
}

impl Trigger {
    /// 从资源当前内容推断触发类型
    pub fn detect(job: &PaymentJob) -> Self {
        if job.metadata.deletion_timestamp.is_some() {
            return Trigger::Delete;
        }

        let status = job.status.as_ref();
        if status.and_then(|s| s.workload_name.as_ref()).is_none() {
            return Trigger::Create;
        }

        // 旧版本写入的 status 没有 observedGeneration，视为尚未观测，不当作修改
        let Some(observed) = status.and_then(|s| s.observed_generation) else {
            return Trigger::Timer;
        };
        match job.metadata.generation {
            Some(generation) if generation > observed => Trigger::Update,
            _ => Trigger::Timer,
        }
    }
}

/// 协调时读取到的集群状态
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Observed {
    /// `None` 表示 Job 不存在
    pub workload: Option<WorkloadStatus>,
}

impl Observed {
    pub fn missing() -> Self {
        Self::default()
    }

    pub fn workload(status: WorkloadStatus) -> Self {
        Self {
            workload: Some(status),
        }
    }
}

/// 一次协调的结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Decision {
    /// 需要创建的 Job；创建结果交给 [`creation_outcome`]
    pub create: Option<Job>,
    pub status_patch: Option<StatusPatch>,
    pub events: Vec<JobEvent>,
}

impl Decision {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_noop(&self) -> bool {
        self.create.is_none() && self.status_patch.is_none() && self.events.is_empty()
    }
}

pub(crate) fn identity(job: &PaymentJob) -> Result<(&str, &str)> {
    let name = job
        .metadata
        .name
        .as_deref()
        .ok_or_else(|| PaymentJobError::Internal("PaymentJob 缺少 metadata.name".to_string()))?;
    let namespace = job.metadata.namespace.as_deref().ok_or_else(|| {
        PaymentJobError::Internal(format!("PaymentJob {name} 缺少 metadata.namespace"))
    })?;
    Ok((name, namespace))
}

/// status 中记录的 Job 名称，没有则按规则重新计算
pub fn resolve_workload_name(job: &PaymentJob) -> Result<String> {
    if let Some(recorded) = job.status.as_ref().and_then(|s| s.workload_name.clone()) {
        return Ok(recorded);
    }
    let (name, namespace) = identity(job)?;
    Ok(workload_name(namespace, name))
}

fn base_patch(job: &PaymentJob) -> StatusPatch {
    StatusPatch {
        resource_version: job.metadata.resource_version.clone(),
        ..StatusPatch::default()
    }
}

/// 阶段迁移对应的 status 修改与事件；不允许的迁移返回 `None`
fn phase_transition(
    job: &PaymentJob,
    workload: &str,
    observed: &WorkloadStatus,
    now: DateTime<Utc>,
) -> Option<(StatusPatch, Vec<JobEvent>)> {
    let current_status = job.status.clone().unwrap_or_default();
    let current = current_status.phase;
    let (next, message) = derive_phase(observed);

    if next == current {
        return None;
    }
    if !current.can_transition_to(next) {
        debug!("忽略阶段回退: {} -> {} ({})", current, next, workload);
        return None;
    }

    let timestamp = format_timestamp(now);
    let mut patch = StatusPatch {
        phase: Some(next),
        last_update_time: Some(timestamp.clone()),
        workload_name: Some(workload.to_string()),
        message: Some(message.clone()),
        ..base_patch(job)
    };
    stamp_times(&mut patch, &current_status, next, &timestamp);

    let events = match next {
        Phase::Succeeded => vec![JobEvent::normal(
            reasons::JOB_SUCCEEDED,
            format!("Job {workload} completed successfully"),
        )],
        Phase::Failed => vec![JobEvent::warning(reasons::JOB_FAILED, message)],
        _ => Vec::new(),
    };

    Some((patch, events))
}

fn stamp_times(patch: &mut StatusPatch, current: &PaymentJobStatus, next: Phase, timestamp: &str) {
    if next == Phase::Running && current.start_time.is_none() {
        patch.start_time = Some(timestamp.to_string());
    }
    if next.is_terminal() && current.completion_time.is_none() {
        patch.completion_time = Some(timestamp.to_string());
    }
}

/// 协调入口
pub fn reconcile(
    trigger: Trigger,
    desired: &PaymentJob,
    observed: &Observed,
    now: DateTime<Utc>,
) -> Result<Decision> {
    match trigger {
        // Job 由 ownerReference 级联删除
        Trigger::Delete => Ok(Decision::none()),
        Trigger::Update => Ok(on_update(desired)),
        Trigger::Create => on_create(desired, observed, now),
        Trigger::Timer => on_timer(desired, observed, now),
    }
}

fn on_update(desired: &PaymentJob) -> Decision {
    let current = desired.status.as_ref();
    let generation = desired.metadata.generation;

    let already_recorded = current.and_then(|s| s.message.as_deref())
        == Some(UPDATE_IGNORED_MESSAGE)
        && current.and_then(|s| s.observed_generation) == generation;
    if already_recorded {
        return Decision::none();
    }

    Decision {
        status_patch: Some(StatusPatch {
            message: Some(UPDATE_IGNORED_MESSAGE.to_string()),
            observed_generation: generation,
            ..base_patch(desired)
        }),
        ..Decision::none()
    }
}

fn on_create(desired: &PaymentJob, observed: &Observed, now: DateTime<Utc>) -> Result<Decision> {
    let (name, namespace) = identity(desired)?;
    let workload = workload_name(namespace, name);

    match &observed.workload {
        // Job 已存在（例如 operator 在创建后重启），只同步状态
        Some(status) => {
            let base = StatusPatch {
                workload_name: Some(workload.clone()),
                last_update_time: Some(format_timestamp(now)),
                observed_generation: desired.metadata.generation,
                ..base_patch(desired)
            };
            let (patch, events) = match phase_transition(desired, &workload, status, now) {
                Some((patch, events)) => (
                    StatusPatch {
                        observed_generation: base.observed_generation,
                        ..patch
                    },
                    events,
                ),
                // 阶段未变化时仍写入 phase，回退则丢弃
                None => {
                    let (derived, _) = derive_phase(status);
                    let current = desired.status.as_ref().map(|s| s.phase).unwrap_or_default();
                    let phase = (derived == current).then_some(derived);
                    (StatusPatch { phase, ..base }, Vec::new())
                }
            };
            Ok(Decision {
                create: None,
                status_patch: Some(patch),
                events,
            })
        }
        None => {
            let uid = desired.metadata.uid.as_deref().ok_or_else(|| {
                PaymentJobError::Internal(format!("PaymentJob {namespace}/{name} 缺少 uid"))
            })?;
            let owner = OwnerIdentity {
                name: name.to_string(),
                uid: uid.to_string(),
            };
            Ok(Decision {
                create: Some(build_job(name, namespace, &desired.spec, &owner)),
                ..Decision::none()
            })
        }
    }
}

/// Job 创建结果 → status 与事件；创建失败为终态，不重试
pub fn creation_outcome(
    desired: &PaymentJob,
    workload: &str,
    outcome: std::result::Result<(), String>,
    now: DateTime<Utc>,
) -> Decision {
    let timestamp = format_timestamp(now);
    let patch = StatusPatch {
        workload_name: Some(workload.to_string()),
        last_update_time: Some(timestamp.clone()),
        observed_generation: desired.metadata.generation,
        ..base_patch(desired)
    };

    match outcome {
        Ok(()) => Decision {
            create: None,
            status_patch: Some(StatusPatch {
                phase: Some(Phase::Pending),
                message: Some(format!("Job {workload} created")),
                ..patch
            }),
            events: vec![JobEvent::normal(
                reasons::JOB_CREATED,
                format!("Created Job {workload}"),
            )],
        },
        Err(reason) => {
            let message = format!("Failed to create Job: {reason}");
            Decision {
                create: None,
                status_patch: Some(StatusPatch {
                    phase: Some(Phase::Failed),
                    message: Some(message.clone()),
                    completion_time: Some(timestamp),
                    ..patch
                }),
                events: vec![JobEvent::warning(reasons::JOB_CREATION_FAILED, message)],
            }
        }
    }
}

fn on_timer(desired: &PaymentJob, observed: &Observed, now: DateTime<Utc>) -> Result<Decision> {
    let Some(status) = &observed.workload else {
        // Job 尚未创建或已被删除
        return Ok(Decision::none());
    };

    let workload = resolve_workload_name(desired)?;
    Ok(match phase_transition(desired, &workload, status, now) {
        Some((patch, events)) => Decision {
            create: None,
            status_patch: Some(patch),
            events,
        },
        None => Decision::none(),
    })
}

/// 距离下一个固定网格时刻的时长
///
/// 网格以 Unix 纪元为原点、`interval` 为步长，与处理耗时无关。
pub fn sharp_delay(now: DateTime<Utc>, interval: Duration) -> Duration {
    let step = interval.as_millis() as i64;
    if step <= 0 {
        return Duration::ZERO;
    }
    let elapsed = now.timestamp_millis().rem_euclid(step);
    Duration::from_millis((step - elapsed) as u64)
}
