//! 响应 DTO

use chrono::{DateTime, Utc};
use notification_service::models::EventMatch;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// 统一 API 响应
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: "操作成功".to_string(),
            data: Some(data),
        }
    }

    pub fn success_empty() -> ApiResponse<()> {
        ApiResponse {
            success: true,
            code: "SUCCESS".to_string(),
            message: "操作成功".to_string(),
            data: None,
        }
    }
}

/// 规则响应 DTO
///
/// 认证信息只返回类型，不回显凭据。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMatchDto {
    pub id: Uuid,
    pub name: String,
    pub jsonpath: String,
    pub owner: String,
    pub target_url: String,
    pub auth_type: String,
    pub extensions: Map<String, Value>,
    pub disabled: bool,
    pub disabled_at: Option<DateTime<Utc>>,
    pub disable_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<EventMatch> for EventMatchDto {
    fn from(rule: EventMatch) -> Self {
        Self {
            disabled: rule.is_disabled(),
            auth_type: rule.auth.kind().to_string(),
            id: rule.id,
            name: rule.name,
            jsonpath: rule.jsonpath,
            owner: rule.owner,
            target_url: rule.target_url,
            extensions: rule.extensions,
            disabled_at: rule.disabled_at,
            disable_reason: rule.disable_reason,
            created_at: rule.created_at,
            updated_at: rule.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_response_success() {
        let response = ApiResponse::success("data");
        assert!(response.success);
        assert_eq!(response.code, "SUCCESS");
        assert_eq!(response.data, Some("data"));

        let empty = ApiResponse::<()>::success_empty();
        let json = serde_json::to_value(&empty).unwrap();
        assert!(json.get("data").is_none());
    }
}
