//! 通知服务错误类型

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use notification_shared::error::NotificationError;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("事件载荷必须是 JSON 对象")]
    InvalidEvent,

    #[error("事件记录不存在: {0}")]
    EventLogNotFound(Uuid),

    #[error("分发队列已关闭")]
    QueueClosed,

    #[error("无效的策略服务地址 {url}: {reason}")]
    InvalidPolicyUrl { url: String, reason: String },

    #[error("HTTP 客户端初始化失败: {0}")]
    HttpClient(String),

    #[error(transparent)]
    Storage(#[from] NotificationError),
}

pub type Result<T> = std::result::Result<T, DispatchError>;

impl DispatchError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidEvent => StatusCode::BAD_REQUEST,
            Self::EventLogNotFound(_) => StatusCode::NOT_FOUND,
            Self::QueueClosed => StatusCode::SERVICE_UNAVAILABLE,
            Self::InvalidPolicyUrl { .. } | Self::HttpClient(_) | Self::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidEvent => "INVALID_EVENT",
            Self::EventLogNotFound(_) => "EVENT_LOG_NOT_FOUND",
            Self::QueueClosed => "QUEUE_CLOSED",
            Self::InvalidPolicyUrl { .. } => "INVALID_POLICY_URL",
            Self::HttpClient(_) => "HTTP_CLIENT_ERROR",
            Self::Storage(e) => e.code(),
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "请求处理失败");
        }

        let body = json!({
            "code": self.error_code(),
            "message": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}
