pub mod config;
pub mod errors;
pub mod logging;
pub mod models;
pub mod retry;
pub mod traits;

pub use config::{BrokerConfig, DatabaseConfig, OperatorConfig, WorkerConfig};
pub use errors::*;
pub use logging::{init_logging, LogConfig, LogFormat};
pub use retry::{BackoffPolicy, FixedBackoff};
pub use traits::{EventPublisher, MessageSource, RecordStore, StatusWriter, WorkloadApi};
