use crate::{PaymentJobError, Result};

/// 从队列收到的一条消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// 确认/拒绝使用的投递句柄
    pub delivery_tag: u64,
    pub message_id: Option<String>,
    pub body: Vec<u8>,
}

impl InboundMessage {
    pub fn new(delivery_tag: u64, message_id: Option<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            delivery_tag,
            message_id,
            body: body.into(),
        }
    }

    /// 解析消息体；非UTF-8或非JSON均视为不可恢复的坏消息
    pub fn parse_payload(&self) -> Result<serde_json::Value> {
        serde_json::from_slice(&self.body)
            .map_err(|e| PaymentJobError::MalformedPayload(e.to_string()))
    }

    /// 日志用的消息体预览
    pub fn preview(&self, limit: usize) -> String {
        let text = String::from_utf8_lossy(&self.body);
        match text.char_indices().nth(limit) {
            Some((idx, _)) => format!("{}...", &text[..idx]),
            None => text.into_owned(),
        }
    }
}
