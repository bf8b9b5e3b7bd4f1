//! HTTP 请求处理器

pub mod event_match;

use axum::Json;
use serde_json::{Value, json};

pub async fn health() -> Json<Value> {
    Json(json!({"status": "healthy"}))
}
