//! 共享库
//!
//! 包含通知服务与规则管理服务共用的配置、错误处理、数据库连接、重试与可观测性基础设施。

pub mod config;
pub mod database;
pub mod error;
pub mod observability;
pub mod retry;
pub mod shutdown;
