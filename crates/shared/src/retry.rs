//! 启动期重试
//!
//! 服务与数据库同时启动时，数据库往往还没准备好接受连接。
//! 这里按固定间隔重试，只重试 `is_retryable` 认可的瞬时错误。

use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::NotificationError;

/// 固定间隔重试策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 总尝试次数（含首次），至少为 1
    pub attempts: u32,
    /// 两次尝试之间的等待时间
    pub wait: Duration,
}

impl RetryPolicy {
    pub fn fixed(attempts: u32, wait: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            wait,
        }
    }

    /// `failed` 为已失败的次数
    pub fn should_retry(&self, failed: u32) -> bool {
        failed < self.attempts
    }
}

/// 按策略执行异步操作
///
/// 不可重试的错误直接返回；次数用尽时返回最后一次的错误。
pub async fn retry_with_policy<F, Fut, T>(
    policy: &RetryPolicy,
    operation_name: &str,
    is_retryable: impl Fn(&NotificationError) -> bool,
    mut operation: F,
) -> Result<T, NotificationError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, NotificationError>>,
{
    let mut failed: u32 = 0;

    loop {
        let err = match operation().await {
            Ok(value) => {
                if failed > 0 {
                    info!(operation = operation_name, failed, "重试后成功");
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        failed += 1;
        if !is_retryable(&err) || !policy.should_retry(failed) {
            warn!(
                operation = operation_name,
                failed,
                attempts = policy.attempts,
                error = %err,
                "放弃重试"
            );
            return Err(err);
        }

        warn!(
            operation = operation_name,
            failed,
            attempts = policy.attempts,
            wait_secs = policy.wait.as_secs(),
            error = %err,
            "操作失败，等待后重试"
        );
        tokio::time::sleep(policy.wait).await;
    }
}
