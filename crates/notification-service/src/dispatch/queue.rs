//! 分发任务队列
//!
//! 接收请求只负责落库并入队，由固定数量的 worker 从共享队列中取任务执行分发。
//! 队列有界，满时入队等待，不丢弃已记录的事件。

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use uuid::Uuid;

use notification_shared::config::DispatchConfig;

use super::pipeline::DispatchPipeline;
use crate::error::{DispatchError, Result};

/// 待分发的事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchJob {
    pub event_log_id: Uuid,
}

/// 入队后返回给调用方的句柄
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DispatchHandle {
    pub event_log_id: Uuid,
}

#[derive(Clone)]
pub struct DispatchQueue {
    tx: mpsc::Sender<DispatchJob>,
}

impl DispatchQueue {
    /// 创建队列，返回发送端和供 worker 共享的接收端
    pub fn channel(capacity: usize) -> (Self, Arc<Mutex<mpsc::Receiver<DispatchJob>>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, Arc::new(Mutex::new(rx)))
    }

    pub async fn enqueue(&self, event_log_id: Uuid) -> Result<DispatchHandle> {
        self.tx
            .send(DispatchJob { event_log_id })
            .await
            .map_err(|_| DispatchError::QueueClosed)?;

        debug!(event_log_id = %event_log_id, "分发任务已入队");
        Ok(DispatchHandle { event_log_id })
    }
}

/// 分发 worker 组
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// 创建队列并启动 worker
    pub fn start(config: &DispatchConfig, pipeline: Arc<DispatchPipeline>) -> (DispatchQueue, Self) {
        let (queue, rx) = DispatchQueue::channel(config.queue_capacity);
        let worker_count = config.worker_count.max(1);

        let handles = (0..worker_count)
            .map(|worker_id| tokio::spawn(worker_loop(worker_id, rx.clone(), pipeline.clone())))
            .collect();

        info!(worker_count, queue_capacity = config.queue_capacity, "分发 worker 已启动");
        (queue, Self { handles })
    }

    /// 等待队列中剩余任务处理完毕
    ///
    /// 所有 `DispatchQueue` 克隆都被丢弃后 worker 才会退出。
    pub async fn shutdown(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!(error = %e, "分发 worker 异常退出");
            }
        }
        info!("分发 worker 已停止");
    }
}

async fn worker_loop(
    worker_id: usize,
    rx: Arc<Mutex<mpsc::Receiver<DispatchJob>>>,
    pipeline: Arc<DispatchPipeline>,
) {
    loop {
        let job = {
            let mut guard = rx.lock().await;
            guard.recv().await
        };

        let Some(job) = job else { break };

        match pipeline.dispatch(job.event_log_id).await {
            Ok(report) => debug!(
                worker_id,
                event_log_id = %job.event_log_id,
                matched = report.matched(),
                "分发任务完成"
            ),
            Err(e) => error!(
                worker_id,
                event_log_id = %job.event_log_id,
                error = %e,
                "分发任务失败"
            ),
        }
    }

    debug!(worker_id, "分发 worker 退出");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::client::{HttpReply, MockDeliveryClient, MockPolicyClient};
    use crate::models::{EventMatch, RuleAuth};
    use crate::repository::{
        EventLogRepositoryTrait, InMemoryEventLogRepository, InMemoryEventMatchRepository,
    };
    use chrono::Utc;
    use serde_json::{Map, json};

    #[tokio::test]
    async fn test_enqueue_after_close_fails() {
        let (queue, rx) = DispatchQueue::channel(1);
        drop(rx);

        let err = queue.enqueue(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, DispatchError::QueueClosed));
    }

    #[tokio::test]
    async fn test_workers_drain_queue_before_shutdown() {
        let rules = Arc::new(InMemoryEventMatchRepository::new());
        let logs = Arc::new(InMemoryEventLogRepository::new());
        let now = Utc::now();
        rules
            .insert(EventMatch {
                id: Uuid::new_v4(),
                name: "all".into(),
                jsonpath: "$.id".into(),
                owner: "alice".into(),
                target_url: "http://alice.example/hook".into(),
                auth: RuleAuth::None,
                extensions: Map::new(),
                disabled_at: None,
                disable_reason: None,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            })
            .await;

        let mut policy = MockPolicyClient::new();
        policy
            .expect_query()
            .times(3)
            .returning(|_, _| Ok(HttpReply::new(200, "ok")));
        let mut delivery = MockDeliveryClient::new();
        delivery
            .expect_deliver()
            .times(3)
            .returning(|_, _, _| Ok(HttpReply::new(200, "ok")));

        let pipeline = Arc::new(DispatchPipeline::new(
            rules,
            logs.clone(),
            Arc::new(policy),
            Arc::new(delivery),
        ));
        let config = DispatchConfig {
            queue_capacity: 2,
            worker_count: 2,
        };
        let (queue, pool) = WorkerPool::start(&config, pipeline.clone());

        let mut ids = Vec::new();
        for i in 0..3 {
            let log = pipeline.ingest(&json!({"id": i})).await.unwrap();
            let handle = queue.enqueue(log.id).await.unwrap();
            assert_eq!(handle.event_log_id, log.id);
            ids.push(log.id);
        }

        drop(queue);
        pool.shutdown().await;

        for id in ids {
            let matches = logs.list_matches(id).await.unwrap();
            assert_eq!(matches.len(), 1);
            assert_eq!(matches[0].target_status_code, Some(200));
        }
    }
}
