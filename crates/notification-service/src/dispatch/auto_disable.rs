//! 失败规则自动禁用

use std::sync::Arc;

use notification_shared::error::Result;
use notification_shared::observability::metrics;
use tracing::warn;
use uuid::Uuid;

use crate::repository::EventMatchRepositoryTrait;

/// 触发禁用的流水线阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Authorize,
    Route,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authorize => "authorize",
            Self::Route => "route",
        }
    }
}

/// 把规则标记为禁用并记录原因
///
/// 禁用后的规则不再参与匹配，直到所属用户通过管理接口重新启用。
#[derive(Clone)]
pub struct AutoDisablePolicy {
    rules: Arc<dyn EventMatchRepositoryTrait>,
}

impl AutoDisablePolicy {
    pub fn new(rules: Arc<dyn EventMatchRepositoryTrait>) -> Self {
        Self { rules }
    }

    pub async fn disable(&self, rule_id: Uuid, reason: &str, stage: FailureStage) -> Result<()> {
        let found = self.rules.disable(rule_id, reason).await?;
        if found {
            metrics::record_rule_disabled(stage.as_str());
            warn!(
                rule_id = %rule_id,
                stage = stage.as_str(),
                reason = %reason,
                "规则已自动禁用"
            );
        } else {
            warn!(rule_id = %rule_id, stage = stage.as_str(), "待禁用的规则不存在");
        }
        Ok(())
    }
}
