//! 应用状态

use std::sync::Arc;

use notification_service::repository::EventMatchRepositoryTrait;
use notification_shared::config::IdentityConfig;

#[derive(Clone)]
pub struct AppState {
    pub rules: Arc<dyn EventMatchRepositoryTrait>,
    /// 调用方身份的请求头与默认用户
    pub identity: IdentityConfig,
}

impl AppState {
    pub fn new(rules: Arc<dyn EventMatchRepositoryTrait>, identity: IdentityConfig) -> Self {
        Self { rules, identity }
    }
}
