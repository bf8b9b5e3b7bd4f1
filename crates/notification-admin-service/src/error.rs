//! 规则管理服务错误类型

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use notification_shared::error::NotificationError;
use rule_matcher::MatchError;
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    // 验证错误
    #[error("参数验证失败: {0}")]
    Validation(String),
    #[error("{0}")]
    InvalidExpression(String),

    // 资源不存在
    #[error("规则不存在: {0}")]
    RuleNotFound(Uuid),
    #[error("资源不存在: {0}")]
    NotFound(String),

    // 系统错误
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),
    #[error("内部错误: {0}")]
    Internal(String),
}

impl AdminError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidExpression(_) => StatusCode::BAD_REQUEST,
            Self::RuleNotFound(_) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidExpression(_) => "INVALID_EXPRESSION",
            Self::RuleNotFound(_) => "RULE_NOT_FOUND",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息记录日志
        let message = match &self {
            Self::Database(e) => {
                tracing::error!(error = %e, "数据库操作失败");
                "服务内部错误，请稍后重试".to_string()
            }
            Self::Internal(e) => {
                tracing::error!(error = %e, "内部错误");
                "服务内部错误，请稍后重试".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": serde_json::Value::Null
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for AdminError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

impl From<MatchError> for AdminError {
    fn from(err: MatchError) -> Self {
        Self::InvalidExpression(err.to_string())
    }
}

impl From<NotificationError> for AdminError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::Database(e) => Self::Database(e),
            NotificationError::InvalidExpression(msg) => Self::InvalidExpression(msg),
            NotificationError::Validation(msg) => Self::Validation(msg),
            NotificationError::NotFound { entity, id } => Self::NotFound(format!("{entity} {id}")),
            other => Self::Internal(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, AdminError>;
