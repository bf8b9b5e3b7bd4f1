//! 请求 DTO

use notification_service::models::{EventMatchChanges, NewEventMatch, RuleAuth};
use serde::Deserialize;
use serde_json::{Map, Value};
use validator::Validate;

/// 创建规则请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventMatchRequest {
    #[validate(length(min = 1, max = 255, message = "规则名称不能为空且不超过255字符"))]
    pub name: String,
    #[validate(length(min = 1, message = "路径表达式不能为空"))]
    pub jsonpath: String,
    #[serde(alias = "target_url")]
    #[validate(url(message = "投递地址必须是合法的 URL"))]
    pub target_url: String,
    #[serde(default)]
    pub auth: RuleAuth,
    #[serde(default)]
    pub extensions: Map<String, Value>,
}

impl CreateEventMatchRequest {
    pub fn into_new_rule(self, owner: &str) -> NewEventMatch {
        NewEventMatch {
            name: self.name,
            jsonpath: self.jsonpath,
            owner: owner.to_string(),
            target_url: self.target_url,
            auth: self.auth,
            extensions: self.extensions,
        }
    }
}

/// 更新规则请求，未提供的字段保持原值
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventMatchRequest {
    #[validate(length(min = 1, max = 255, message = "规则名称不能为空且不超过255字符"))]
    pub name: Option<String>,
    #[validate(length(min = 1, message = "路径表达式不能为空"))]
    pub jsonpath: Option<String>,
    #[serde(alias = "target_url")]
    #[validate(url(message = "投递地址必须是合法的 URL"))]
    pub target_url: Option<String>,
    pub auth: Option<RuleAuth>,
    pub extensions: Option<Map<String, Value>>,
    /// false 重新启用被禁用的规则，true 手动禁用
    pub disabled: Option<bool>,
}

impl From<UpdateEventMatchRequest> for EventMatchChanges {
    fn from(req: UpdateEventMatchRequest) -> Self {
        Self {
            name: req.name,
            jsonpath: req.jsonpath,
            target_url: req.target_url,
            auth: req.auth,
            extensions: req.extensions,
            disabled: req.disabled,
        }
    }
}
