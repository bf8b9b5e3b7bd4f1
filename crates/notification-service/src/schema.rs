//! 数据库结构版本门禁
//!
//! 服务启动前比较持久化版本与代码期望的版本：主版本不同拒绝启动。
//! `apply` 先执行迁移，最后一步才写入版本号，迁移中途失败不会留下新版本号。

use std::sync::Arc;

use notification_shared::error::{NotificationError, Result};
use tracing::{info, warn};

use crate::models::SchemaVersion;
use crate::repository::SchemaVersionRepositoryTrait;

/// 一次版本比较的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaCheck {
    pub persisted: SchemaVersion,
    pub expected: SchemaVersion,
}

impl SchemaCheck {
    pub fn is_safe(&self) -> bool {
        self.persisted.is_safe_with(&self.expected)
    }

    pub fn is_equal(&self) -> bool {
        self.persisted.is_equal_to(&self.expected)
    }

    fn incompatible(&self) -> NotificationError {
        NotificationError::SchemaIncompatible {
            persisted: self.persisted.to_string(),
            expected: self.expected.to_string(),
        }
    }
}

pub struct SchemaGate {
    repo: Arc<dyn SchemaVersionRepositoryTrait>,
    expected: SchemaVersion,
}

impl SchemaGate {
    pub fn new(repo: Arc<dyn SchemaVersionRepositoryTrait>) -> Self {
        Self::with_expected(repo, SchemaVersion::CURRENT)
    }

    pub fn with_expected(repo: Arc<dyn SchemaVersionRepositoryTrait>, expected: SchemaVersion) -> Self {
        Self { repo, expected }
    }

    pub fn expected(&self) -> SchemaVersion {
        self.expected
    }

    /// 读取并比较版本，没有版本记录视为 0.0
    pub async fn check(&self) -> Result<SchemaCheck> {
        let persisted = self.repo.current().await?.unwrap_or(SchemaVersion::ABSENT);
        Ok(SchemaCheck {
            persisted,
            expected: self.expected,
        })
    }

    /// 启动门禁：主版本不一致时返回 `SchemaIncompatible`
    pub async fn ensure_safe(&self) -> Result<SchemaCheck> {
        let check = self.check().await?;
        if !check.is_safe() {
            return Err(check.incompatible());
        }
        if !check.is_equal() {
            warn!(
                persisted = %check.persisted,
                expected = %check.expected,
                "数据库结构次版本不一致，继续运行"
            );
        }
        Ok(check)
    }

    /// 要求主次版本完全一致
    pub async fn ensure_equal(&self) -> Result<SchemaCheck> {
        let check = self.check().await?;
        if !check.is_equal() {
            return Err(check.incompatible());
        }
        Ok(check)
    }

    /// 执行迁移并写入期望版本
    pub async fn apply(&self) -> Result<SchemaVersion> {
        self.repo.run_migrations().await?;
        self.repo.write_version(self.expected).await?;
        info!(version = %self.expected, "数据库结构已更新");
        Ok(self.expected)
    }
}
