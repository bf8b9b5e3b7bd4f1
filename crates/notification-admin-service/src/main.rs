//! 订阅规则管理服务
//!
//! 提供 `/eventmatch` 规则管理 REST API。

use std::sync::Arc;

use notification_admin_service::{routes, state::AppState};
use notification_service::{SchemaGate, repository::{EventMatchRepository, SchemaVersionRepository}};
use notification_shared::{
    config::AppConfig, database::Database, observability, shutdown::shutdown_signal,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load("notification-admin").unwrap_or_default();

    let obs_config = config
        .observability
        .clone()
        .with_service_name(&config.service_name);
    let _guard = observability::init(&obs_config).await?;

    info!("Starting notification-admin on {}", config.server_addr());

    let db = Database::connect_with_retry(&config.database).await?;

    let check = SchemaGate::new(Arc::new(SchemaVersionRepository::new(db.pool().clone())))
        .ensure_safe()
        .await?;
    info!(persisted = %check.persisted, "Schema version verified");

    let state = AppState::new(
        Arc::new(EventMatchRepository::new(db.pool().clone())),
        config.identity.clone(),
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let app = routes::app(state).layer(cors);

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}
