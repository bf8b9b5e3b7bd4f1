//! 事件接入 handler

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::{Value, json};
use tracing::{error, warn};

use crate::dispatch::DispatchHandle;
use crate::error::Result;
use crate::state::AppState;

/// 接收事件
///
/// 事件落库后立即返回，分发在后台 worker 中进行。
/// 落库成功即视为接收成功；入队失败的事件可通过 replay 重新分发。
pub async fn receive(
    State(state): State<AppState>,
    Json(event): Json<Value>,
) -> Result<Json<DispatchHandle>> {
    let log = state.pipeline.ingest(&event).await?;
    let handle = match state.queue.enqueue(log.id).await {
        Ok(handle) => handle,
        Err(e) => {
            error!(event_log_id = %log.id, error = %e, "事件已记录但入队失败，需要重放");
            DispatchHandle {
                event_log_id: log.id,
            }
        }
    };
    Ok(Json(handle))
}

pub async fn health() -> impl IntoResponse {
    Json(json!({"status": "healthy"}))
}

/// 就绪检查：数据库可用才接收流量
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.health_check().await {
        Ok(()) => (StatusCode::OK, Json(json!({"status": "ready"}))),
        Err(e) => {
            warn!(error = %e, "数据库不可用");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"status": "not_ready", "database": e.to_string()})),
            )
        }
    }
}
