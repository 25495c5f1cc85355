//! Test data builders for creating PaymentJob resources
//!
//! Defaults describe a freshly applied resource in namespace `default`
//! that the operator has not seen yet.

use chrono::{DateTime, Utc};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::api::ObjectMeta;
use paymentjob_core::models::{
    BrokerEndpoint, CredentialRef, DatabaseEndpoint, PaymentJob, PaymentJobSpec, PaymentJobStatus,
    Phase,
};

/// Builder for creating test PaymentJob resources
pub struct PaymentJobBuilder {
    job: PaymentJob,
}

impl PaymentJobBuilder {
    pub fn new(name: &str) -> Self {
        let spec = PaymentJobSpec {
            image: "registry.local/payment-worker:1.0".to_string(),
            queue_name: "payments".to_string(),
            max_messages: None,
            broker: BrokerEndpoint {
                host: "rabbitmq".to_string(),
                port: None,
                credential_ref: CredentialRef {
                    name: "rabbit-creds".to_string(),
                },
            },
            database: DatabaseEndpoint {
                host: "postgres".to_string(),
                port: None,
                database: "payments_db".to_string(),
                credential_ref: CredentialRef {
                    name: "pg-creds".to_string(),
                },
            },
        };

        let mut job = PaymentJob::new(name, spec);
        job.metadata = ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("default".to_string()),
            uid: Some(format!("uid-{name}")),
            generation: Some(1),
            resource_version: Some("1".to_string()),
            ..ObjectMeta::default()
        };
        Self { job }
    }

    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.job.metadata.namespace = Some(namespace.to_string());
        self
    }

    pub fn with_uid(mut self, uid: &str) -> Self {
        self.job.metadata.uid = Some(uid.to_string());
        self
    }

    pub fn with_generation(mut self, generation: i64) -> Self {
        self.job.metadata.generation = Some(generation);
        self
    }

    pub fn with_resource_version(mut self, version: &str) -> Self {
        self.job.metadata.resource_version = Some(version.to_string());
        self
    }

    pub fn with_image(mut self, image: &str) -> Self {
        self.job.spec.image = image.to_string();
        self
    }

    pub fn with_queue(mut self, queue_name: &str) -> Self {
        self.job.spec.queue_name = queue_name.to_string();
        self
    }

    pub fn with_max_messages(mut self, max_messages: u64) -> Self {
        self.job.spec.max_messages = Some(max_messages);
        self
    }

    pub fn with_broker(mut self, host: &str, port: Option<u16>, secret: &str) -> Self {
        self.job.spec.broker = BrokerEndpoint {
            host: host.to_string(),
            port,
            credential_ref: CredentialRef {
                name: secret.to_string(),
            },
        };
        self
    }

    pub fn with_database(
        mut self,
        host: &str,
        port: Option<u16>,
        database: &str,
        secret: &str,
    ) -> Self {
        self.job.spec.database = DatabaseEndpoint {
            host: host.to_string(),
            port,
            database: database.to_string(),
            credential_ref: CredentialRef {
                name: secret.to_string(),
            },
        };
        self
    }

    pub fn with_status(mut self, status: PaymentJobStatus) -> Self {
        self.job.status = Some(status);
        self
    }

    /// Status as left behind after the Job was created
    pub fn with_workload(mut self, workload_name: &str, phase: Phase) -> Self {
        let status = self.job.status.get_or_insert_with(PaymentJobStatus::default);
        status.workload_name = Some(workload_name.to_string());
        status.phase = phase;
        status.observed_generation = self.job.metadata.generation;
        self
    }

    pub fn with_message(mut self, message: &str) -> Self {
        self.job
            .status
            .get_or_insert_with(PaymentJobStatus::default)
            .message = Some(message.to_string());
        self
    }

    pub fn deleted_at(mut self, at: DateTime<Utc>) -> Self {
        self.job.metadata.deletion_timestamp = Some(Time(at));
        self
    }

    pub fn build(self) -> PaymentJob {
        self.job
    }
}
