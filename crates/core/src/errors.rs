use thiserror::Error;

/// PaymentJob 统一错误类型
#[derive(Debug, Error)]
pub enum PaymentJobError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Kubernetes API错误: {0}")]
    Kube(#[from] kube::Error),

    #[error("资源版本冲突: {0}")]
    Conflict(String),

    #[error("消息队列错误: {0}")]
    MessageQueue(String),

    #[error("消息体不是合法的JSON: {0}")]
    MalformedPayload(String),

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("连接 {target} 失败，已重试 {attempts} 次: {last_error}")]
    RetriesExhausted {
        target: String,
        attempts: u32,
        last_error: String,
    },

    #[error("内部错误: {0}")]
    Internal(String),
}

impl PaymentJobError {
    /// 存储层错误需要重新建立连接
    pub fn is_storage(&self) -> bool {
        matches!(self, PaymentJobError::Database(_))
    }

    /// Kubernetes 返回的 HTTP 状态码（仅 API 错误）
    pub fn api_status_code(&self) -> Option<u16> {
        match self {
            PaymentJobError::Kube(kube::Error::Api(response)) => Some(response.code),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.api_status_code() == Some(404)
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, PaymentJobError::Conflict(_)) || self.api_status_code() == Some(409)
    }

    /// 面向用户的简短原因，写入 status.message
    pub fn reason(&self) -> String {
        match self {
            PaymentJobError::Kube(kube::Error::Api(response)) => {
                if response.message.is_empty() {
                    response.reason.clone()
                } else {
                    response.message.clone()
                }
            }
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for PaymentJobError {
    fn from(err: serde_json::Error) -> Self {
        PaymentJobError::Serialization(err.to_string())
    }
}

/// 统一的Result类型
pub type Result<T> = std::result::Result<T, PaymentJobError>;

#[cfg(test)]
mod tests {
    use super::*;
    use kube::error::ErrorResponse;

    fn api_error(code: u16, reason: &str, message: &str) -> PaymentJobError {
        PaymentJobError::Kube(kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: message.to_string(),
            reason: reason.to_string(),
            code,
        }))
    }

    #[test]
    fn test_not_found_and_conflict_classification() {
        assert!(api_error(404, "NotFound", "jobs not found").is_not_found());
        assert!(!api_error(500, "InternalError", "boom").is_not_found());
        assert!(api_error(409, "Conflict", "object has been modified").is_conflict());
        assert!(PaymentJobError::Conflict("stale".into()).is_conflict());
    }

    #[test]
    fn test_reason_prefers_api_message() {
        let err = api_error(403, "Forbidden", "jobs.batch is forbidden");
        assert_eq!(err.reason(), "jobs.batch is forbidden");

        let err = api_error(422, "Invalid", "");
        assert_eq!(err.reason(), "Invalid");
    }

    #[test]
    fn test_storage_classification() {
        assert!(PaymentJobError::Database(sqlx::Error::PoolClosed).is_storage());
        assert!(!PaymentJobError::MessageQueue("closed".into()).is_storage());
    }
}
