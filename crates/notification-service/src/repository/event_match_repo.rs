//! 订阅规则仓储

use async_trait::async_trait;
use notification_shared::error::Result;
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use super::traits::EventMatchRepositoryTrait;
use crate::models::{EventMatch, EventMatchChanges, NewEventMatch};

pub struct EventMatchRepository {
    pool: PgPool,
}

impl EventMatchRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventMatchRepositoryTrait for EventMatchRepository {
    async fn find_eligible(&self) -> Result<Vec<EventMatch>> {
        let rules = sqlx::query_as::<_, EventMatch>(
            r#"
            SELECT id, name, jsonpath, owner, target_url, auth, extensions,
                   disabled_at, disable_reason, created_at, updated_at, deleted_at
            FROM event_matches
            WHERE disabled_at IS NULL AND deleted_at IS NULL
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rules)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<EventMatch>> {
        let rule = sqlx::query_as::<_, EventMatch>(
            r#"
            SELECT id, name, jsonpath, owner, target_url, auth, extensions,
                   disabled_at, disable_reason, created_at, updated_at, deleted_at
            FROM event_matches
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(rule)
    }

    async fn disable(&self, id: Uuid, reason: &str) -> Result<bool> {
        // 单条语句完成，并发禁用同一规则时 disabled_at 保持第一次的时间
        let result = sqlx::query(
            r#"
            UPDATE event_matches
            SET disabled_at = COALESCE(disabled_at, NOW()),
                disable_reason = $2
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(reason)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn create(&self, rule: &NewEventMatch) -> Result<EventMatch> {
        let created = sqlx::query_as::<_, EventMatch>(
            r#"
            INSERT INTO event_matches (id, name, jsonpath, owner, target_url, auth, extensions)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, name, jsonpath, owner, target_url, auth, extensions,
                      disabled_at, disable_reason, created_at, updated_at, deleted_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(&rule.name)
        .bind(&rule.jsonpath)
        .bind(&rule.owner)
        .bind(&rule.target_url)
        .bind(Json(&rule.auth))
        .bind(Json(&rule.extensions))
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn list_by_owner(&self, owner: &str) -> Result<Vec<EventMatch>> {
        let rules = sqlx::query_as::<_, EventMatch>(
            r#"
            SELECT id, name, jsonpath, owner, target_url, auth, extensions,
                   disabled_at, disable_reason, created_at, updated_at, deleted_at
            FROM event_matches
            WHERE owner = $1 AND deleted_at IS NULL
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        Ok(rules)
    }

    async fn find_owned(&self, id: Uuid, owner: &str) -> Result<Option<EventMatch>> {
        let rule = sqlx::query_as::<_, EventMatch>(
            r#"
            SELECT id, name, jsonpath, owner, target_url, auth, extensions,
                   disabled_at, disable_reason, created_at, updated_at, deleted_at
            FROM event_matches
            WHERE id = $1 AND owner = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;

        Ok(rule)
    }

    async fn update(
        &self,
        id: Uuid,
        owner: &str,
        changes: &EventMatchChanges,
    ) -> Result<Option<EventMatch>> {
        let updated = sqlx::query_as::<_, EventMatch>(
            r#"
            UPDATE event_matches
            SET name = COALESCE($3, name),
                jsonpath = COALESCE($4, jsonpath),
                target_url = COALESCE($5, target_url),
                auth = COALESCE($6, auth),
                extensions = COALESCE($7, extensions),
                disabled_at = CASE
                    WHEN $8::BOOLEAN IS NULL THEN disabled_at
                    WHEN $8::BOOLEAN THEN COALESCE(disabled_at, NOW())
                    ELSE NULL
                END,
                disable_reason = CASE
                    WHEN $8::BOOLEAN IS NULL THEN disable_reason
                    WHEN $8::BOOLEAN THEN COALESCE(disable_reason, 'disabled by owner')
                    ELSE NULL
                END,
                updated_at = NOW()
            WHERE id = $1 AND owner = $2 AND deleted_at IS NULL
            RETURNING id, name, jsonpath, owner, target_url, auth, extensions,
                      disabled_at, disable_reason, created_at, updated_at, deleted_at
            "#,
        )
        .bind(id)
        .bind(owner)
        .bind(changes.name.as_deref())
        .bind(changes.jsonpath.as_deref())
        .bind(changes.target_url.as_deref())
        .bind(changes.auth.as_ref().map(Json))
        .bind(changes.extensions.as_ref().map(Json))
        .bind(changes.disabled)
        .fetch_optional(&self.pool)
        .await?;

        Ok(updated)
    }

    async fn soft_delete(&self, id: Uuid, owner: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE event_matches
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND owner = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(owner)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
