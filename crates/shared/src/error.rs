//! 统一错误处理模块
//!
//! 定义系统中所有共享的错误类型，使用 thiserror 提供良好的错误信息。

use thiserror::Error;

/// 系统错误类型
#[derive(Debug, Error)]
pub enum NotificationError {
    // ==================== 数据库错误 ====================
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("数据库迁移失败: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("记录未找到: {entity} id={id}")]
    NotFound { entity: String, id: String },

    // ==================== 规则错误 ====================
    #[error("无效的路径表达式: {0}")]
    InvalidExpression(String),

    // ==================== 验证错误 ====================
    #[error("参数验证失败: {0}")]
    Validation(String),

    // ==================== 版本错误 ====================
    #[error("数据库结构版本不兼容: 持久化版本 {persisted}, 期望版本 {expected}")]
    SchemaIncompatible { persisted: String, expected: String },

    // ==================== 配置错误 ====================
    #[error("配置错误: {0}")]
    Config(#[from] config::ConfigError),

    // ==================== 通用错误 ====================
    #[error("内部错误: {0}")]
    Internal(String),
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, NotificationError>;

impl NotificationError {
    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::Database(_) => "DATABASE_ERROR",
            Self::Migration(_) => "MIGRATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::InvalidExpression(_) => "INVALID_EXPRESSION",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::SchemaIncompatible { .. } => "SCHEMA_INCOMPATIBLE",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 是否为可重试错误
    ///
    /// 只有连接层面的数据库故障值得重试，SQL 语义错误重试也不会成功。
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Database(
                sqlx::Error::Io(_)
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::Tls(_)
            )
        )
    }
}
