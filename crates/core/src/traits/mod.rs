pub mod message_source;
pub mod record_store;
pub mod workload_api;

pub use message_source::MessageSource;
pub use record_store::RecordStore;
pub use workload_api::{EventPublisher, StatusWriter, WorkloadApi};
