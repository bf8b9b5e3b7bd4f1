//! 路径表达式
//!
//! 对 JSONPath（RFC 9535）查询的薄封装：创建/更新规则时校验表达式，
//! 分发时对事件载荷求值。只关心"是否至少命中一个节点"，不暴露节点本身。

use serde_json::Value;
use serde_json_path::JsonPath;

use crate::error::{MatchError, Result};

/// 已解析的路径表达式
///
/// 解析后不可变，可在多个分发任务间共享。
#[derive(Debug, Clone)]
pub struct PathExpression {
    source: String,
    path: JsonPath,
}

impl PathExpression {
    /// 解析表达式，语法错误返回 `InvalidExpression`
    pub fn parse(expression: &str) -> Result<Self> {
        let path = JsonPath::parse(expression).map_err(|e| MatchError::InvalidExpression {
            expression: expression.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            source: expression.to_string(),
            path,
        })
    }

    /// 原始表达式文本
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// 至少命中一个节点即为匹配
    pub fn matches(&self, event: &Value) -> bool {
        !self.path.query(event).is_empty()
    }

    /// 命中的节点数量，用于调试日志
    pub fn match_count(&self, event: &Value) -> usize {
        self.path.query(event).len()
    }
}

/// 校验表达式语法
///
/// 规则写入前调用，保证存储中的表达式都可解析。
pub fn validate(expression: &str) -> Result<()> {
    PathExpression::parse(expression).map(|_| ())
}

/// 对事件载荷求值
///
/// 表达式在写入时已校验，这里解析失败仍返回 `InvalidExpression` 而不是 panic。
pub fn matches(expression: &str, event: &Value) -> Result<bool> {
    Ok(PathExpression::parse(expression)?.matches(event))
}
