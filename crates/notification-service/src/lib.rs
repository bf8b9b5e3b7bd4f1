//! 事件通知服务
//!
//! 接收事件并按订阅规则分发：
//! - 事件落库后入队，由后台 worker 执行匹配、策略查询与 webhook 投递
//! - 每个 (事件, 规则) 的策略与投递结果写入审计表
//! - 策略服务或投递目标失败时自动禁用对应规则
//! - 启动前校验数据库结构版本

pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod routes;
pub mod schema;
pub mod state;

pub use dispatch::{DispatchPipeline, DispatchQueue, RuleOutcome, WorkerPool};
pub use error::{DispatchError, Result};
pub use schema::{SchemaCheck, SchemaGate};
