use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::Phase;

pub const API_GROUP: &str = "payments.example.com";
pub const API_VERSION: &str = "v1alpha1";
pub const KIND: &str = "PaymentJob";

pub const DEFAULT_BROKER_PORT: u16 = 5672;
pub const DEFAULT_DATABASE_PORT: u16 = 5432;

/// PaymentJob 资源定义
///
/// spec 在创建后视为不可变，修改需要删除后重建。
#[derive(CustomResource, Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "payments.example.com",
    version = "v1alpha1",
    kind = "PaymentJob",
    plural = "paymentjobs",
    shortname = "pj",
    namespaced,
    status = "PaymentJobStatus",
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Job","type":"string","jsonPath":".status.workloadName"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct PaymentJobSpec {
    /// worker 容器镜像
    pub image: String,
    /// 消费的队列名称
    pub queue_name: String,
    /// 处理上限，达到后 worker 自行退出
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_messages: Option<u64>,
    #[serde(alias = "rabbitmq")]
    pub broker: BrokerEndpoint,
    #[serde(alias = "postgres")]
    pub database: DatabaseEndpoint,
}

/// 凭据引用：指向包含 `username` / `password` 的 Secret
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CredentialRef {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BrokerEndpoint {
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(alias = "secretRef")]
    pub credential_ref: CredentialRef,
}

impl BrokerEndpoint {
    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_BROKER_PORT)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseEndpoint {
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub database: String,
    #[serde(alias = "secretRef")]
    pub credential_ref: CredentialRef,
}

impl DatabaseEndpoint {
    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_DATABASE_PORT)
    }
}

/// PaymentJob 状态（由 operator 写入）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentJobStatus {
    #[serde(default)]
    pub phase: Phase,
    #[serde(default, alias = "jobName", skip_serializing_if = "Option::is_none")]
    pub workload_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}
