//! CLI 命令定义

use clap::{Parser, Subcommand};
use uuid::Uuid;

/// 事件通知系统管理工具
#[derive(Parser, Debug)]
#[command(name = "notification-cmd")]
#[command(version, about = "事件通知系统管理工具")]
#[command(propagate_version = true)]
pub struct Cli {
    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 执行数据库迁移，最后写入当前结构版本
    Dbsync,

    /// 检查数据库结构版本
    ///
    /// 主版本一致即通过；指定 --equal 时要求主次版本完全一致。
    Dbchk {
        #[arg(long)]
        equal: bool,
    },

    /// 重放已记录的事件
    ///
    /// 对指定事件重新执行 匹配 -> 授权 -> 投递，不会新建事件记录。
    Replay {
        #[arg(required = true)]
        event_log_ids: Vec<Uuid>,
    },
}
