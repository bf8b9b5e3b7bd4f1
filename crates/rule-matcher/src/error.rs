//! 匹配引擎错误类型

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("无效的路径表达式 `{expression}`: {reason}")]
    InvalidExpression { expression: String, reason: String },
}

pub type Result<T> = std::result::Result<T, MatchError>;
