pub mod delivery;
pub mod payment_job;
pub mod phase;
pub mod record;
pub mod status;
pub mod workload;

pub use delivery::InboundMessage;
pub use payment_job::{
    BrokerEndpoint, CredentialRef, DatabaseEndpoint, PaymentJob, PaymentJobSpec,
    PaymentJobStatus, API_GROUP, API_VERSION, DEFAULT_BROKER_PORT, DEFAULT_DATABASE_PORT, KIND,
};
pub use phase::Phase;
pub use record::NewPaymentRecord;
pub use status::{format_timestamp, JobEvent, JobEventType, StatusPatch, TIMESTAMP_FORMAT};
pub use workload::{OwnerIdentity, WorkloadCondition, WorkloadStatus};
