use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use super::Phase;

/// status 时间戳格式: `YYYY-MM-DDThh:mm:ssZ`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// 对 PaymentJob status 的增量修改，只序列化被设置的字段
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPatch {
    /// 乐观并发: 基于哪个 resourceVersion 计算出的修改
    #[serde(skip)]
    pub resource_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workload_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl StatusPatch {
    /// 生成 JSON merge patch；带 resourceVersion 时由 API server 做版本校验
    pub fn to_merge_patch(&self) -> serde_json::Value {
        let status = serde_json::to_value(self).unwrap_or_else(|_| json!({}));
        match &self.resource_version {
            Some(version) => json!({
                "metadata": { "resourceVersion": version },
                "status": status,
            }),
            None => json!({ "status": status }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobEventType {
    Normal,
    Warning,
}

/// 挂在 PaymentJob 上的 Kubernetes Event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobEvent {
    pub event_type: JobEventType,
    pub reason: String,
    pub note: String,
}

impl JobEvent {
    pub fn normal(reason: &str, note: impl Into<String>) -> Self {
        Self {
            event_type: JobEventType::Normal,
            reason: reason.to_string(),
            note: note.into(),
        }
    }

    pub fn warning(reason: &str, note: impl Into<String>) -> Self {
        Self {
            event_type: JobEventType::Warning,
            reason: reason.to_string(),
            note: note.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_timestamp_second_precision() {
        let at = Utc.with_ymd_and_hms(2026, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(format_timestamp(at), "2026-03-09T07:05:01Z");
    }

    #[test]
    fn test_merge_patch_only_contains_set_fields() {
        let patch = StatusPatch {
            phase: Some(Phase::Running),
            start_time: Some("2026-03-09T07:05:01Z".into()),
            ..Default::default()
        };
        assert_eq!(
            patch.to_merge_patch(),
            json!({ "status": { "phase": "Running", "startTime": "2026-03-09T07:05:01Z" } })
        );
    }

    #[test]
    fn test_merge_patch_carries_resource_version() {
        let patch = StatusPatch {
            resource_version: Some("4711".into()),
            message: Some("hello".into()),
            ..Default::default()
        };
        assert_eq!(
            patch.to_merge_patch(),
            json!({
                "metadata": { "resourceVersion": "4711" },
                "status": { "message": "hello" }
            })
        );
    }
}
