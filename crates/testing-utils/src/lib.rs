//! # PaymentJob Testing Utils
//!
//! Shared test doubles for the operator and worker crates.
//!
//! - **Cluster mocks**: `MockWorkloadApi`, `MockStatusWriter`, `MockEventPublisher`
//! - **Delivery mocks**: `MockMessageSource`, `MockRecordStore`
//! - **Builders**: `PaymentJobBuilder`
//! - **Helpers**: polling, fixed clocks and worker settings
//!
//! ```toml
//! [dev-dependencies]
//! paymentjob-testing-utils = { path = "../testing-utils" }
//! ```

pub mod builders;
pub mod helpers;
pub mod mocks;

pub use builders::*;
pub use helpers::*;
pub use mocks::*;
