//! 事件通知系统管理工具
//!
//! 数据库结构同步与检查、事件重放。

use std::process::ExitCode;

use clap::Parser;
use notification_admin_service::cli::{Cli, CommandRunner, Commands};
use notification_shared::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // 优先使用环境变量 RUST_LOG，否则使用命令行参数指定的级别
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let runner = CommandRunner::new(AppConfig::load("notification-cmd")?);

    let passed = match cli.command {
        Commands::Dbsync => {
            runner.run_dbsync().await?;
            true
        }
        Commands::Dbchk { equal } => runner.run_dbchk(equal).await?,
        Commands::Replay { event_log_ids } => runner.run_replay(&event_log_ids).await?,
    };

    Ok(if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
