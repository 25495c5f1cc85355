//! PaymentJob operator
//!
//! 把 PaymentJob 资源映射为 batch/v1 Job，并定期把 Job 状态回写到资源的 status。

pub mod controller;
pub mod phase_deriver;
pub mod reconciler;
pub mod service;
pub mod workload_builder;

pub use controller::{Context, PaymentJobController};
pub use phase_deriver::derive_phase;
pub use reconciler::{creation_outcome, reconcile, sharp_delay, Decision, Observed, Trigger};
pub use service::ReconcileService;
pub use workload_builder::{build_job, workload_name};
