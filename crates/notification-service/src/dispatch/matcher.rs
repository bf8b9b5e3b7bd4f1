//! 规则匹配抽象

use rule_matcher::{MatchError, PathExpression};
use serde_json::Value;
use tracing::debug;

/// 判断规则表达式是否命中事件
#[cfg_attr(test, mockall::automock)]
pub trait RuleMatcher: Send + Sync {
    fn matches(&self, expression: &str, event: &Value) -> Result<bool, MatchError>;
}

/// 基于 JSONPath 的默认实现
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonPathMatcher;

impl RuleMatcher for JsonPathMatcher {
    fn matches(&self, expression: &str, event: &Value) -> Result<bool, MatchError> {
        let path = PathExpression::parse(expression)?;
        let count = path.match_count(event);
        debug!(expression, count, "路径表达式求值");
        Ok(count > 0)
    }
}
