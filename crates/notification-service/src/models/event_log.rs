//! 事件审计记录

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// 接收到的事件，写入后不再修改
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EventLog {
    pub id: Uuid,
    pub received_payload: Value,
    pub received_at: DateTime<Utc>,
}

/// 单条规则对单个事件的处理记录
///
/// 策略查询有响应时创建；target_* 字段只在投递得到响应后写入一次。
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EventLogMatch {
    pub id: Uuid,
    pub event_log_id: Uuid,
    pub rule_id: Uuid,
    pub policy_status_code: i32,
    pub policy_response_body: String,
    #[sqlx(default)]
    pub target_status_code: Option<i32>,
    #[sqlx(default)]
    pub target_response_body: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventLogMatch {
    pub fn is_delivered(&self) -> bool {
        self.target_status_code.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewEventLogMatch {
    pub event_log_id: Uuid,
    pub rule_id: Uuid,
    pub policy_status_code: i32,
    pub policy_response_body: String,
}
