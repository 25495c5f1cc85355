use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// PaymentJob 生命周期阶段
///
/// 偏序: `Pending < Running < {Succeeded, Failed}`，阶段只前进不回退。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Phase {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Succeeded | Phase::Failed)
    }

    fn rank(&self) -> u8 {
        match self {
            Phase::Pending => 0,
            Phase::Running => 1,
            Phase::Succeeded | Phase::Failed => 2,
        }
    }

    /// 是否允许从当前阶段迁移到 `next`
    ///
    /// 终态不再迁移；非终态只能迁移到更靠后的阶段。
    pub fn can_transition_to(&self, next: Phase) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Pending => "Pending",
            Phase::Running => "Running",
            Phase::Succeeded => "Succeeded",
            Phase::Failed => "Failed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
