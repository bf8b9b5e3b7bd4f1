//! 调用方身份
//!
//! 身份由前置代理写入请求头（默认 `Http-Remote-User`），未携带时使用配置的默认用户。
//! 规则的增删改查都限定在该身份名下。

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity(pub String);

impl CallerIdentity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromRequestParts<AppState> for CallerIdentity {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = parts
            .headers
            .get(state.identity.header.as_str())
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from)
            .unwrap_or_else(|| state.identity.default_user.clone());

        Ok(Self(user))
    }
}
