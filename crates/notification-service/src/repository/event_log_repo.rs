//! 事件审计仓储

use async_trait::async_trait;
use notification_shared::error::Result;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use super::traits::EventLogRepositoryTrait;
use crate::models::{EventLog, EventLogMatch, NewEventLogMatch};

pub struct EventLogRepository {
    pool: PgPool,
}

impl EventLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventLogRepositoryTrait for EventLogRepository {
    async fn create_event(&self, payload: &Value) -> Result<EventLog> {
        let log = sqlx::query_as::<_, EventLog>(
            r#"
            INSERT INTO event_logs (id, received_payload)
            VALUES ($1, $2)
            RETURNING id, received_payload, received_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(payload)
        .fetch_one(&self.pool)
        .await?;

        Ok(log)
    }

    async fn get_event(&self, id: Uuid) -> Result<Option<EventLog>> {
        let log = sqlx::query_as::<_, EventLog>(
            r#"
            SELECT id, received_payload, received_at
            FROM event_logs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(log)
    }

    async fn create_match(&self, record: &NewEventLogMatch) -> Result<EventLogMatch> {
        let created = sqlx::query_as::<_, EventLogMatch>(
            r#"
            INSERT INTO event_log_matches
                (id, event_log_id, rule_id, policy_status_code, policy_response_body)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, event_log_id, rule_id, policy_status_code, policy_response_body,
                      target_status_code, target_response_body, created_at, updated_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(record.event_log_id)
        .bind(record.rule_id)
        .bind(record.policy_status_code)
        .bind(&record.policy_response_body)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn record_target(&self, match_id: Uuid, status_code: i32, body: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE event_log_matches
            SET target_status_code = $2,
                target_response_body = $3,
                updated_at = NOW()
            WHERE id = $1 AND target_status_code IS NULL
            "#,
        )
        .bind(match_id)
        .bind(status_code)
        .bind(body)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_matches(&self, event_log_id: Uuid) -> Result<Vec<EventLogMatch>> {
        let matches = sqlx::query_as::<_, EventLogMatch>(
            r#"
            SELECT id, event_log_id, rule_id, policy_status_code, policy_response_body,
                   target_status_code, target_response_body, created_at, updated_at
            FROM event_log_matches
            WHERE event_log_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(event_log_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(matches)
    }
}
