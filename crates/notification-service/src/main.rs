//! 事件通知服务
//!
//! 提供 `/receive` 事件接入端点，后台 worker 执行规则匹配、授权与投递。

use std::sync::Arc;

use anyhow::Result;
use notification_service::{
    DispatchPipeline, SchemaGate, WorkerPool,
    dispatch::{HttpDeliveryClient, HttpPolicyClient},
    repository::{EventLogRepository, EventMatchRepository, SchemaVersionRepository},
    routes,
    state::AppState,
};
use notification_shared::{
    config::AppConfig, database::Database, observability, shutdown::shutdown_signal,
};
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load("notification-service").unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });

    let obs_config = config
        .observability
        .clone()
        .with_service_name(&config.service_name);
    let _guard = observability::init(&obs_config).await?;

    info!("Starting notification-service...");
    info!(environment = %config.environment, "Configuration loaded");

    // 数据库可能晚于服务启动，按配置重试连接
    let db = Database::connect_with_retry(&config.database).await?;
    let pool = db.pool().clone();
    info!("Database connection established");

    let check = SchemaGate::new(Arc::new(SchemaVersionRepository::new(pool.clone())))
        .ensure_safe()
        .await?;
    info!(persisted = %check.persisted, expected = %check.expected, "Schema version verified");

    let pipeline = Arc::new(DispatchPipeline::new(
        Arc::new(EventMatchRepository::new(pool.clone())),
        Arc::new(EventLogRepository::new(pool)),
        Arc::new(HttpPolicyClient::new(&config.policy)?),
        Arc::new(HttpDeliveryClient::new(&config.delivery)?),
    ));
    info!(policy_url = %config.policy.base_url, "Dispatch pipeline initialized");

    let (queue, workers) = WorkerPool::start(&config.dispatch, pipeline.clone());

    let app = routes::app(AppState::new(pipeline, queue, db.clone()));

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 路由释放后队列发送端全部关闭，等待 worker 处理完剩余任务
    workers.shutdown().await;
    db.close().await;

    info!("Service shutdown complete");
    Ok(())
}
