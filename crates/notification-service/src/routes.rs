//! 接入服务路由

use axum::{
    Router, middleware,
    routing::{get, post},
};
use notification_shared::observability::middleware as obs_middleware;

use crate::{handlers, state::AppState};

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/receive", post(handlers::receive))
        .route("/health", get(handlers::health))
        .route("/ready", get(handlers::ready))
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .with_state(state)
}
