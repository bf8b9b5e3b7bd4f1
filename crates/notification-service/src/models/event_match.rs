//! 订阅规则实体
//!
//! 一条规则 = 路径表达式 + 所属用户 + 投递目标。表达式命中事件后，
//! 先向策略服务确认所属用户有权接收，再把事件投递到 target_url。

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// 投递时使用的认证方式
///
/// 存储为 JSONB，形如 `{"type": "basic", "basic": {"username": "..", "password": ".."}}`
/// 或 `{"type": "header", "header": {"type": "Bearer", "credentials": ".."}}`。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RuleAuth {
    #[default]
    None,
    Basic { basic: BasicAuth },
    Header { header: HeaderAuth },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicAuth {
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderAuth {
    /// 认证方案，例如 `Bearer`
    #[serde(rename = "type")]
    pub scheme: String,
    pub credentials: String,
}

impl RuleAuth {
    /// 转换为 Authorization 头的值，`None` 不携带认证头
    pub fn authorization_value(&self) -> Option<String> {
        match self {
            Self::None => None,
            Self::Basic { basic } => {
                let raw = format!("{}:{}", basic.username, basic.password);
                Some(format!("Basic {}", STANDARD.encode(raw)))
            }
            Self::Header { header } => Some(format!("{} {}", header.scheme, header.credentials)),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Basic { .. } => "basic",
            Self::Header { .. } => "header",
        }
    }
}

/// 订阅规则
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EventMatch {
    pub id: Uuid,
    pub name: String,
    /// JSONPath 表达式，写入前已校验
    pub jsonpath: String,
    /// 规则所属用户，也是策略查询的主体
    pub owner: String,
    pub target_url: String,
    #[sqlx(json)]
    pub auth: RuleAuth,
    /// 投递前合并进事件 extensions 的键值，同名键以规则为准
    #[sqlx(json)]
    pub extensions: Map<String, Value>,
    #[sqlx(default)]
    pub disabled_at: Option<DateTime<Utc>>,
    #[sqlx(default)]
    pub disable_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[sqlx(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl EventMatch {
    pub fn is_disabled(&self) -> bool {
        self.disabled_at.is_some()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// 未禁用且未删除的规则才参与匹配
    pub fn is_eligible(&self) -> bool {
        !self.is_disabled() && !self.is_deleted()
    }
}

/// 新建规则
#[derive(Debug, Clone, PartialEq)]
pub struct NewEventMatch {
    pub name: String,
    pub jsonpath: String,
    pub owner: String,
    pub target_url: String,
    pub auth: RuleAuth,
    pub extensions: Map<String, Value>,
}

/// 规则的部分更新，`None` 表示保持原值
///
/// `disabled = Some(false)` 会清除 disabled_at 和 disable_reason，重新启用规则。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventMatchChanges {
    pub name: Option<String>,
    pub jsonpath: Option<String>,
    pub target_url: Option<String>,
    pub auth: Option<RuleAuth>,
    pub extensions: Option<Map<String, Value>>,
    pub disabled: Option<bool>,
}
