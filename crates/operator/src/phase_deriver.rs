use paymentjob_core::models::{Phase, WorkloadStatus};

/// Job 状态计数 → (阶段, 说明)
///
/// 优先级: succeeded > failed > active > pending。同时报告 active 与 failed 时按失败处理。
pub fn derive_phase(status: &WorkloadStatus) -> (Phase, String) {
    if status.succeeded > 0 {
        return (Phase::Succeeded, "Job completed successfully".to_string());
    }

    if status.failed > 0 {
        let message = status
            .conditions
            .iter()
            .find(|c| c.condition_type == "Failed" && c.status == "True")
            .map(|c| {
                c.message
                    .clone()
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "Job failed".to_string())
            })
            .unwrap_or_else(|| format!("Job failed after {} attempt(s)", status.failed));
        return (Phase::Failed, message);
    }

    if status.active > 0 {
        return (
            Phase::Running,
            format!("Job is running ({} active pod(s))", status.active),
        );
    }

    (Phase::Pending, "Waiting for pod to start".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_counters_are_pending() {
        assert_eq!(
            derive_phase(&WorkloadStatus::pending()),
            (Phase::Pending, "Waiting for pod to start".to_string())
        );
    }

    #[test]
    fn test_active_is_running() {
        assert_eq!(
            derive_phase(&WorkloadStatus::active(2)),
            (Phase::Running, "Job is running (2 active pod(s))".to_string())
        );
    }

    #[test]
    fn test_succeeded_wins_over_everything() {
        let status = WorkloadStatus {
            active: 1,
            succeeded: 1,
            failed: 2,
            ..WorkloadStatus::default()
        };
        assert_eq!(derive_phase(&status).0, Phase::Succeeded);
    }

    #[test]
    fn test_failed_masks_stale_active_counter() {
        let status = WorkloadStatus {
            active: 1,
            failed: 1,
            ..WorkloadStatus::default()
        };
        assert_eq!(
            derive_phase(&status),
            (Phase::Failed, "Job failed after 1 attempt(s)".to_string())
        );
    }

    #[test]
    fn test_failed_prefers_condition_message() {
        let status = WorkloadStatus::failed(4).with_condition(
            "Failed",
            "True",
            Some("Job has reached the specified backoff limit"),
        );
        assert_eq!(
            derive_phase(&status).1,
            "Job has reached the specified backoff limit"
        );
    }

    #[test]
    fn test_failed_condition_without_message() {
        let status = WorkloadStatus::failed(4).with_condition("Failed", "True", None);
        assert_eq!(derive_phase(&status).1, "Job failed");
    }

    #[test]
    fn test_inactive_failed_condition_is_ignored() {
        let status =
            WorkloadStatus::failed(2).with_condition("Failed", "False", Some("not yet"));
        assert_eq!(derive_phase(&status).1, "Job failed after 2 attempt(s)");
    }
}
