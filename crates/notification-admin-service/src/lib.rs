//! 订阅规则管理服务
//!
//! 提供规则 CRUD 的 REST API，以及数据库结构同步、版本检查、事件重放的命令行工具。
//!
//! ## 模块结构
//!
//! - `dto`: 请求和响应的数据传输对象
//! - `identity`: 调用方身份提取
//! - `handlers`: HTTP 请求处理器
//! - `routes`: 路由配置
//! - `cli`: `notification-cmd` 命令定义与执行

pub mod cli;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod routes;
pub mod state;

pub use error::{AdminError, Result};
