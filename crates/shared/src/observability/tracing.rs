//! 日志初始化
//!
//! 基于 tracing-subscriber 组合环境过滤器与格式化层，支持 pretty 与 JSON 两种输出。

use anyhow::Result;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use super::ObservabilityConfig;

/// 构建环境过滤器
///
/// RUST_LOG 优先，其次配置中的 log_level，都无效时回退到 info。
pub fn env_filter(config: &ObservabilityConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// 初始化 tracing 日志
pub fn init(config: &ObservabilityConfig) -> Result<()> {
    let fmt_layer = if config.json_logs() {
        fmt::layer()
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .with_target(true)
            .with_thread_ids(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
