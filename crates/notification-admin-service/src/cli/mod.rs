//! `notification-cmd` 命令行工具
//!
//! - `dbsync` - 执行数据库迁移并写入结构版本
//! - `dbchk` - 检查数据库结构版本是否与代码兼容
//! - `replay` - 对已记录的事件重新执行分发
//!
//! ```bash
//! notification-cmd dbsync
//! notification-cmd dbchk --equal
//! notification-cmd replay 0190f3a2-... 0190f3a3-...
//! ```

pub mod commands;
pub mod runner;

pub use commands::{Cli, Commands};
pub use runner::CommandRunner;
