//! PaymentJob → batch/v1 Job 的纯函数映射

use std::collections::BTreeMap;

use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{
    Container, EnvVar, EnvVarSource, PodSpec, PodTemplateSpec, ResourceRequirements,
    SecretKeySelector,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use paymentjob_core::models::{OwnerIdentity, PaymentJobSpec, API_GROUP, API_VERSION, KIND};
use sha2::{Digest, Sha256};

/// Job 名称上限（DNS label）
pub const MAX_WORKLOAD_NAME_LEN: usize = 63;
const NAME_PREFIX: &str = "paymentjob-";
const MAX_BASE_LEN: usize = 54;
const DIGEST_LEN: usize = 8;

pub const CONTAINER_NAME: &str = "payment-worker";
pub const MANAGED_BY: &str = "paymentjob-operator";

const CPU_REQUEST: &str = "100m";
const MEMORY_REQUEST: &str = "128Mi";
const CPU_LIMIT: &str = "500m";
const MEMORY_LIMIT: &str = "256Mi";
const BACKOFF_LIMIT: i32 = 3;
const TTL_SECONDS_AFTER_FINISHED: i32 = 300;

/// 由 namespace 与资源名确定性地生成 Job 名称
///
/// `paymentjob-<name>` 截断到 54 个字符，再接 `-` 和
/// `sha256("<namespace>/<name>")` 的前 8 位十六进制。
pub fn workload_name(namespace: &str, resource_name: &str) -> String {
    let base: String = format!("{NAME_PREFIX}{resource_name}")
        .chars()
        .take(MAX_BASE_LEN)
        .collect();
    let digest = format!(
        "{:x}",
        Sha256::digest(format!("{namespace}/{resource_name}").as_bytes())
    );
    format!("{base}-{}", &digest[..DIGEST_LEN])
}

pub fn workload_labels(resource_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("app".to_string(), CONTAINER_NAME.to_string()),
        ("paymentjob".to_string(), resource_name.to_string()),
        ("managed-by".to_string(), MANAGED_BY.to_string()),
    ])
}

fn plain_env(name: &str, value: impl Into<String>) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.into()),
        value_from: None,
    }
}

fn secret_env(name: &str, secret: &str, key: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: None,
        value_from: Some(EnvVarSource {
            secret_key_ref: Some(SecretKeySelector {
                name: secret.to_string(),
                key: key.to_string(),
                optional: None,
            }),
            ..EnvVarSource::default()
        }),
    }
}

/// worker 容器的环境变量，凭据只以 secretKeyRef 引用
pub fn worker_env(spec: &PaymentJobSpec) -> Vec<EnvVar> {
    let broker_secret = &spec.broker.credential_ref.name;
    let database_secret = &spec.database.credential_ref.name;

    let mut env = vec![
        plain_env("QUEUE_NAME", &spec.queue_name),
        plain_env("RABBITMQ_HOST", &spec.broker.host),
        plain_env("RABBITMQ_PORT", spec.broker.port_or_default().to_string()),
        secret_env("RABBITMQ_USER", broker_secret, "username"),
        secret_env("RABBITMQ_PASS", broker_secret, "password"),
        plain_env("POSTGRES_HOST", &spec.database.host),
        plain_env("POSTGRES_PORT", spec.database.port_or_default().to_string()),
        plain_env("POSTGRES_DB", &spec.database.database),
        secret_env("POSTGRES_USER", database_secret, "username"),
        secret_env("POSTGRES_PASS", database_secret, "password"),
    ];

    if let Some(max_messages) = spec.max_messages {
        env.push(plain_env("MAX_MESSAGES", max_messages.to_string()));
    }
    env
}

fn quantities(cpu: &str, memory: &str) -> BTreeMap<String, Quantity> {
    BTreeMap::from([
        ("cpu".to_string(), Quantity(cpu.to_string())),
        ("memory".to_string(), Quantity(memory.to_string())),
    ])
}

pub fn owner_reference(owner: &OwnerIdentity) -> OwnerReference {
    OwnerReference {
        api_version: format!("{API_GROUP}/{API_VERSION}"),
        kind: KIND.to_string(),
        name: owner.name.clone(),
        uid: owner.uid.clone(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }
}

/// 构建 PaymentJob 对应的 Job
pub fn build_job(
    resource_name: &str,
    namespace: &str,
    spec: &PaymentJobSpec,
    owner: &OwnerIdentity,
) -> Job {
    let labels = workload_labels(resource_name);

    let container = Container {
        name: CONTAINER_NAME.to_string(),
        image: Some(spec.image.clone()),
        image_pull_policy: Some("IfNotPresent".to_string()),
        env: Some(worker_env(spec)),
        resources: Some(ResourceRequirements {
            requests: Some(quantities(CPU_REQUEST, MEMORY_REQUEST)),
            limits: Some(quantities(CPU_LIMIT, MEMORY_LIMIT)),
            ..ResourceRequirements::default()
        }),
        ..Container::default()
    };

    Job {
        metadata: ObjectMeta {
            name: Some(workload_name(namespace, resource_name)),
            namespace: Some(namespace.to_string()),
            labels: Some(labels.clone()),
            owner_references: Some(vec![owner_reference(owner)]),
            ..ObjectMeta::default()
        },
        spec: Some(JobSpec {
            backoff_limit: Some(BACKOFF_LIMIT),
            ttl_seconds_after_finished: Some(TTL_SECONDS_AFTER_FINISHED),
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..ObjectMeta::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    restart_policy: Some("OnFailure".to_string()),
                    ..PodSpec::default()
                }),
            },
            ..JobSpec::default()
        }),
        status: None,
    }
}
