//! 事件匹配引擎
//!
//! 提供订阅规则的路径表达式校验与匹配能力：
//! - 规则写入时校验 JSONPath 语法
//! - 分发时判断表达式是否命中事件载荷中的至少一个节点
//!
//! 纯函数，无 I/O，可在多个分发任务中并发调用。

pub mod error;
pub mod expression;

pub use error::{MatchError, Result};
pub use expression::{PathExpression, matches, validate};
