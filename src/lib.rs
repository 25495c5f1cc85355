pub mod app;
pub mod crd;
pub mod publisher;
pub mod shutdown;
