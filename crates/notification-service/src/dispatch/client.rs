//! 策略服务与投递目标的 HTTP 客户端
//!
//! 两个 trait 把出站 HTTP 与流水线隔离开：流水线只关心状态码和响应体，
//! 连接失败、超时等传输层错误统一为 `TransportError`。

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Url};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use notification_shared::config::{DeliveryConfig, PolicyConfig};

use super::classify::ResponseClass;
use crate::error::{DispatchError, Result};
use crate::models::RuleAuth;

/// 对端返回的响应
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn class(&self) -> ResponseClass {
        ResponseClass::from_status(self.status)
    }
}

/// 没有拿到 HTTP 响应
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self(format!("request timed out: {err}"))
        } else {
            Self(err.to_string())
        }
    }
}

/// 策略服务：判断规则所属用户是否有权接收该事件
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PolicyClient: Send + Sync {
    async fn query(
        &self,
        owner: &str,
        event: &Value,
    ) -> std::result::Result<HttpReply, TransportError>;
}

/// webhook 投递
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeliveryClient: Send + Sync {
    async fn deliver(
        &self,
        target_url: &str,
        auth: &RuleAuth,
        event: &Value,
    ) -> std::result::Result<HttpReply, TransportError>;
}

/// 把响应读成 (状态码, 响应体)
///
/// 已经收到状态行就算对端有响应，响应体读取失败时用错误文本代替。
async fn read_reply(response: reqwest::Response) -> HttpReply {
    let status = response.status().as_u16();
    reply_with_body(status, response.text().await)
}

fn reply_with_body<E: std::fmt::Display>(
    status: u16,
    body: std::result::Result<String, E>,
) -> HttpReply {
    match body {
        Ok(body) => HttpReply { status, body },
        Err(e) => {
            warn!(status, error = %e, "读取响应体失败");
            HttpReply {
                status,
                body: format!("failed to read response body: {e}"),
            }
        }
    }
}

/// `POST {base_url}/events/{owner}`
pub struct HttpPolicyClient {
    client: Client,
    base_url: Url,
}

impl HttpPolicyClient {
    pub fn new(config: &PolicyConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| DispatchError::InvalidPolicyUrl {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(DispatchError::InvalidPolicyUrl {
                url: config.base_url.clone(),
                reason: "not a base url".to_string(),
            });
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| DispatchError::HttpClient(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    /// 用户标识作为单独的路径段，特殊字符会被转义
    pub fn query_url(&self, owner: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("events").push(owner);
        }
        url
    }
}

#[async_trait]
impl PolicyClient for HttpPolicyClient {
    async fn query(
        &self,
        owner: &str,
        event: &Value,
    ) -> std::result::Result<HttpReply, TransportError> {
        let url = self.query_url(owner);
        debug!(url = %url, "查询策略服务");

        let response = self.client.post(url).json(event).send().await?;
        Ok(read_reply(response).await)
    }
}

/// 按规则的认证方式 POST 事件到 target_url
pub struct HttpDeliveryClient {
    client: Client,
}

impl HttpDeliveryClient {
    pub fn new(config: &DeliveryConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| DispatchError::HttpClient(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl DeliveryClient for HttpDeliveryClient {
    async fn deliver(
        &self,
        target_url: &str,
        auth: &RuleAuth,
        event: &Value,
    ) -> std::result::Result<HttpReply, TransportError> {
        debug!(target_url = %target_url, auth = auth.kind(), "投递事件");

        let mut request = self.client.post(target_url).json(event);
        if let Some(value) = auth.authorization_value() {
            request = request.header(AUTHORIZATION, value);
        }

        let response = request.send().await?;
        Ok(read_reply(response).await)
    }
}
