use k8s_openapi::api::batch::v1::JobStatus;

/// workload 所属的 PaymentJob 身份
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerIdentity {
    pub name: String,
    pub uid: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadCondition {
    pub condition_type: String,
    pub status: String,
    pub message: Option<String>,
}

/// Job 的实时状态计数
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkloadStatus {
    pub active: i32,
    pub succeeded: i32,
    pub failed: i32,
    pub conditions: Vec<WorkloadCondition>,
}

impl WorkloadStatus {
    pub fn pending() -> Self {
        Self::default()
    }

    pub fn active(count: i32) -> Self {
        Self {
            active: count,
            ..Self::default()
        }
    }

    pub fn succeeded(count: i32) -> Self {
        Self {
            succeeded: count,
            ..Self::default()
        }
    }

    pub fn failed(count: i32) -> Self {
        Self {
            failed: count,
            ..Self::default()
        }
    }

    pub fn with_condition(mut self, condition_type: &str, status: &str, message: Option<&str>) -> Self {
        self.conditions.push(WorkloadCondition {
            condition_type: condition_type.to_string(),
            status: status.to_string(),
            message: message.map(str::to_string),
        });
        self
    }
}

impl From<&JobStatus> for WorkloadStatus {
    fn from(status: &JobStatus) -> Self {
        Self {
            active: status.active.unwrap_or(0),
            succeeded: status.succeeded.unwrap_or(0),
            failed: status.failed.unwrap_or(0),
            conditions: status
                .conditions
                .iter()
                .flatten()
                .map(|c| WorkloadCondition {
                    condition_type: c.type_.clone(),
                    status: c.status.clone(),
                    message: c.message.clone(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::batch::v1::JobCondition;

    #[test]
    fn test_from_job_status_defaults_missing_counters() {
        let status = JobStatus {
            active: Some(1),
            ..Default::default()
        };
        let observed = WorkloadStatus::from(&status);
        assert_eq!(observed, WorkloadStatus::active(1));
    }

    #[test]
    fn test_from_job_status_copies_conditions() {
        let status = JobStatus {
            failed: Some(4),
            conditions: Some(vec![JobCondition {
                type_: "Failed".to_string(),
                status: "True".to_string(),
                message: Some("Job has reached the specified backoff limit".to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        };
        let observed = WorkloadStatus::from(&status);
        assert_eq!(observed.failed, 4);
        assert_eq!(observed.conditions.len(), 1);
        assert_eq!(observed.conditions[0].condition_type, "Failed");
    }
}
