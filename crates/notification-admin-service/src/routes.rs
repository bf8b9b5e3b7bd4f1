//! 路由配置

use axum::{
    Router, middleware,
    routing::get,
};
use notification_shared::observability::middleware as obs_middleware;

use crate::{handlers, state::AppState};

/// 规则管理路由
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/eventmatch",
            get(handlers::event_match::list_event_matches)
                .post(handlers::event_match::create_event_match),
        )
        .route(
            "/eventmatch/{id}",
            get(handlers::event_match::get_event_match)
                .put(handlers::event_match::update_event_match)
                .delete(handlers::event_match::delete_event_match),
        )
}

/// 完整应用：业务路由 + 健康检查 + 可观测性中间件
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(api_routes())
        .route("/health", get(handlers::health))
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .with_state(state)
}
