use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 待写入的支付记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPaymentRecord {
    pub received_at: DateTime<Utc>,
    pub payload: serde_json::Value,
    pub message_id: Option<String>,
    pub source_queue: String,
}

impl NewPaymentRecord {
    pub fn new(payload: serde_json::Value, message_id: Option<String>, source_queue: &str) -> Self {
        Self {
            received_at: Utc::now(),
            payload,
            message_id,
            source_queue: source_queue.to_string(),
        }
    }
}
