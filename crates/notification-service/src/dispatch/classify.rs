//! HTTP 响应分类

/// 按状态码首位分类，决定流水线下一步
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseClass {
    /// 2xx
    Success,
    /// 4xx
    ClientError,
    /// 5xx
    ServerError,
    /// 1xx、3xx 及其他
    Other,
}

impl ResponseClass {
    pub fn from_status(status: u16) -> Self {
        match status / 100 {
            2 => Self::Success,
            4 => Self::ClientError,
            5 => Self::ServerError,
            _ => Self::Other,
        }
    }

    /// 指标标签
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::ClientError => "client_error",
            Self::ServerError => "server_error",
            Self::Other => "other",
        }
    }

    /// 4xx 和 5xx 都视为失败
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::ClientError | Self::ServerError)
    }
}
