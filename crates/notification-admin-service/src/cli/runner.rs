//! 命令执行器

use std::sync::Arc;

use anyhow::Result;
use notification_service::{
    DispatchPipeline, SchemaCheck, SchemaGate,
    dispatch::{DispatchReport, HttpDeliveryClient, HttpPolicyClient},
    repository::{EventLogRepository, EventMatchRepository, SchemaVersionRepository},
};
use notification_shared::{config::AppConfig, database::Database};
use tracing::{error, info};
use uuid::Uuid;

pub struct CommandRunner {
    config: AppConfig,
}

impl CommandRunner {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    async fn connect(&self) -> Result<Database> {
        Ok(Database::connect_with_retry(&self.config.database).await?)
    }

    fn schema_gate(db: &Database) -> SchemaGate {
        SchemaGate::new(Arc::new(SchemaVersionRepository::new(db.pool().clone())))
    }

    /// 执行迁移并写入版本
    pub async fn run_dbsync(&self) -> Result<()> {
        let db = self.connect().await?;
        let version = Self::schema_gate(&db).apply().await?;
        println!("database schema synced to {version}");
        db.close().await;
        Ok(())
    }

    /// 检查版本，返回是否通过
    pub async fn run_dbchk(&self, equal: bool) -> Result<bool> {
        let db = self.connect().await?;
        let check = Self::schema_gate(&db).check().await?;
        db.close().await;

        let passed = dbchk_passed(&check, equal);
        println!(
            "persisted {} expected {} -> {}",
            check.persisted,
            check.expected,
            if passed { "ok" } else { "mismatch" }
        );
        Ok(passed)
    }

    /// 重放事件，任一事件失败时返回 false
    pub async fn run_replay(&self, event_log_ids: &[Uuid]) -> Result<bool> {
        let db = self.connect().await?;
        Self::schema_gate(&db).ensure_safe().await?;

        let pool = db.pool().clone();
        let pipeline = DispatchPipeline::new(
            Arc::new(EventMatchRepository::new(pool.clone())),
            Arc::new(EventLogRepository::new(pool)),
            Arc::new(HttpPolicyClient::new(&self.config.policy)?),
            Arc::new(HttpDeliveryClient::new(&self.config.delivery)?),
        );

        let mut all_ok = true;
        for id in event_log_ids {
            match pipeline.dispatch(*id).await {
                Ok(report) => {
                    info!(event_log_id = %id, matched = report.matched(), "事件重放完成");
                    all_ok &= report.failures.is_empty();
                    println!("{}", summary_line(&report));
                }
                Err(e) => {
                    error!(event_log_id = %id, error = %e, "事件重放失败");
                    all_ok = false;
                    println!("{id}: error: {e}");
                }
            }
        }

        db.close().await;
        Ok(all_ok)
    }
}

fn dbchk_passed(check: &SchemaCheck, equal: bool) -> bool {
    if equal { check.is_equal() } else { check.is_safe() }
}

/// 单个事件的重放摘要
pub fn summary_line(report: &DispatchReport) -> String {
    let delivered = report
        .outcomes
        .iter()
        .filter(|(_, outcome)| outcome.is_delivered())
        .count();
    let disabled = report
        .outcomes
        .iter()
        .filter(|(_, outcome)| outcome.disabled_rule())
        .count();

    format!(
        "{}: evaluated={} matched={} delivered={} disabled={} failures={}",
        report.event_log_id,
        report.rules_evaluated,
        report.matched(),
        delivered,
        disabled,
        report.failures.len()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use notification_service::RuleOutcome;
    use notification_service::models::SchemaVersion;

    #[test]
    fn test_dbchk_passed() {
        let check = SchemaCheck {
            persisted: SchemaVersion::new(1, 3),
            expected: SchemaVersion::new(1, 5),
        };
        assert!(dbchk_passed(&check, false));
        assert!(!dbchk_passed(&check, true));

        let absent = SchemaCheck {
            persisted: SchemaVersion::ABSENT,
            expected: SchemaVersion::CURRENT,
        };
        assert!(!dbchk_passed(&absent, false));
    }

    #[test]
    fn test_summary_line() {
        let event_log_id = Uuid::nil();
        let report = DispatchReport {
            event_log_id,
            rules_evaluated: 4,
            outcomes: vec![
                (Uuid::new_v4(), RuleOutcome::Delivered { target_status: 200 }),
                (
                    Uuid::new_v4(),
                    RuleOutcome::PolicyFailed {
                        policy_status: Some(500),
                    },
                ),
                (Uuid::new_v4(), RuleOutcome::Rejected { policy_status: 403 }),
            ],
            failures: vec![],
        };

        assert_eq!(
            summary_line(&report),
            format!(
                "{event_log_id}: evaluated=4 matched=3 delivered=1 disabled=1 failures=0"
            )
        );
    }
}
