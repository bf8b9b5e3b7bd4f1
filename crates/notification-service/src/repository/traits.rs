//! 仓储 Trait 定义

use async_trait::async_trait;
use notification_shared::error::Result;
use serde_json::Value;
use uuid::Uuid;

use crate::models::{
    EventLog, EventLogMatch, EventMatch, EventMatchChanges, NewEventLogMatch, NewEventMatch,
    SchemaVersion,
};

/// 订阅规则仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventMatchRepositoryTrait: Send + Sync {
    // 分发
    /// 未禁用且未删除的规则
    async fn find_eligible(&self) -> Result<Vec<EventMatch>>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<EventMatch>>;
    /// 原子地禁用规则：disabled_at 只在首次禁用时写入，reason 总是覆盖。
    /// 返回规则是否存在。
    async fn disable(&self, id: Uuid, reason: &str) -> Result<bool>;

    // 管理
    async fn create(&self, rule: &NewEventMatch) -> Result<EventMatch>;
    async fn list_by_owner(&self, owner: &str) -> Result<Vec<EventMatch>>;
    async fn find_owned(&self, id: Uuid, owner: &str) -> Result<Option<EventMatch>>;
    async fn update(
        &self,
        id: Uuid,
        owner: &str,
        changes: &EventMatchChanges,
    ) -> Result<Option<EventMatch>>;
    async fn soft_delete(&self, id: Uuid, owner: &str) -> Result<bool>;
}

/// 事件审计仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventLogRepositoryTrait: Send + Sync {
    async fn create_event(&self, payload: &Value) -> Result<EventLog>;
    async fn get_event(&self, id: Uuid) -> Result<Option<EventLog>>;
    async fn create_match(&self, record: &NewEventLogMatch) -> Result<EventLogMatch>;
    /// 写入投递结果，已写过的记录不会被覆盖，返回是否写入
    async fn record_target(&self, match_id: Uuid, status_code: i32, body: &str) -> Result<bool>;
    async fn list_matches(&self, event_log_id: Uuid) -> Result<Vec<EventLogMatch>>;
}

/// 结构版本仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SchemaVersionRepositoryTrait: Send + Sync {
    /// 读取持久化的版本，表或记录不存在时返回 None
    async fn current(&self) -> Result<Option<SchemaVersion>>;
    async fn run_migrations(&self) -> Result<()>;
    async fn write_version(&self, version: SchemaVersion) -> Result<()>;
}
