//! 结构版本仓储

use async_trait::async_trait;
use notification_shared::error::Result;
use sqlx::PgPool;
use tracing::info;

use super::traits::SchemaVersionRepositoryTrait;
use crate::models::SchemaVersion;

pub struct SchemaVersionRepository {
    pool: PgPool,
}

impl SchemaVersionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SchemaVersionRepositoryTrait for SchemaVersionRepository {
    async fn current(&self) -> Result<Option<SchemaVersion>> {
        // 全新数据库上版本表还不存在
        let exists: bool =
            sqlx::query_scalar("SELECT to_regclass('notification_system') IS NOT NULL")
                .fetch_one(&self.pool)
                .await?;
        if !exists {
            return Ok(None);
        }

        let version = sqlx::query_as::<_, SchemaVersion>(
            "SELECT major, minor FROM notification_system WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(version)
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        info!("数据库迁移完成");
        Ok(())
    }

    async fn write_version(&self, version: SchemaVersion) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notification_system (id, major, minor)
            VALUES (1, $1, $2)
            ON CONFLICT (id) DO UPDATE
            SET major = EXCLUDED.major, minor = EXCLUDED.minor, updated_at = NOW()
            "#,
        )
        .bind(version.major)
        .bind(version.minor)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
