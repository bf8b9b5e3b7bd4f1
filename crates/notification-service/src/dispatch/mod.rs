//! 事件分发
//!
//! 一个分发周期：加载可用规则 -> 路径表达式匹配 -> 对每条命中规则
//! 独立执行 授权（策略查询）-> 路由（webhook 投递），失败时自动禁用规则。
//!
//! ```text
//! Matched -> PolicyPending -> Authorized -> Delivered
//!                          |              \-> DeliveryFailed
//!                          \-> Rejected / PolicyFailed / PolicyUnrecognized
//! ```

mod auto_disable;
mod classify;
mod client;
mod matcher;
mod pipeline;
mod queue;
mod routing;

pub use auto_disable::{AutoDisablePolicy, FailureStage};
pub use classify::ResponseClass;
pub use client::{
    DeliveryClient, HttpDeliveryClient, HttpPolicyClient, HttpReply, PolicyClient, TransportError,
};
pub use matcher::{JsonPathMatcher, RuleMatcher};
pub use pipeline::{DispatchPipeline, DispatchReport, RuleOutcome};
pub use queue::{DispatchHandle, DispatchJob, DispatchQueue, WorkerPool};
pub use routing::merge_extensions;

#[cfg(test)]
pub use client::{MockDeliveryClient, MockPolicyClient};
#[cfg(test)]
pub use matcher::MockRuleMatcher;
