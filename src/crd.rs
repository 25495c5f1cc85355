use anyhow::{Context, Result};
use kube::CustomResourceExt;
use paymentjob_core::models::PaymentJob;

/// PaymentJob CustomResourceDefinition 的 YAML
pub fn crd_yaml() -> Result<String> {
    serde_yaml::to_string(&PaymentJob::crd()).context("序列化CRD失败")
}
