//! 内存仓储实现
//!
//! 与 PostgreSQL 实现语义一致（软删除、禁用时间只写一次、投递结果只写一次），
//! 用于测试和本地调试。

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use notification_shared::error::Result;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::traits::{EventLogRepositoryTrait, EventMatchRepositoryTrait};
use crate::models::{
    EventLog, EventLogMatch, EventMatch, EventMatchChanges, NewEventLogMatch, NewEventMatch,
};

#[derive(Default)]
pub struct InMemoryEventMatchRepository {
    rules: RwLock<HashMap<Uuid, EventMatch>>,
}

impl InMemoryEventMatchRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 直接写入一条完整规则
    pub async fn insert(&self, rule: EventMatch) {
        self.rules.write().await.insert(rule.id, rule);
    }

    pub async fn get(&self, id: Uuid) -> Option<EventMatch> {
        self.rules.read().await.get(&id).cloned()
    }
}

#[async_trait]
impl EventMatchRepositoryTrait for InMemoryEventMatchRepository {
    async fn find_eligible(&self) -> Result<Vec<EventMatch>> {
        let rules = self.rules.read().await;
        let mut eligible: Vec<EventMatch> =
            rules.values().filter(|r| r.is_eligible()).cloned().collect();
        eligible.sort_by_key(|r| r.created_at);
        Ok(eligible)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<EventMatch>> {
        Ok(self.get(id).await)
    }

    async fn disable(&self, id: Uuid, reason: &str) -> Result<bool> {
        let mut rules = self.rules.write().await;
        let Some(rule) = rules.get_mut(&id) else {
            return Ok(false);
        };
        rule.disabled_at.get_or_insert_with(Utc::now);
        rule.disable_reason = Some(reason.to_string());
        Ok(true)
    }

    async fn create(&self, rule: &NewEventMatch) -> Result<EventMatch> {
        let now = Utc::now();
        let created = EventMatch {
            id: Uuid::now_v7(),
            name: rule.name.clone(),
            jsonpath: rule.jsonpath.clone(),
            owner: rule.owner.clone(),
            target_url: rule.target_url.clone(),
            auth: rule.auth.clone(),
            extensions: rule.extensions.clone(),
            disabled_at: None,
            disable_reason: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.insert(created.clone()).await;
        Ok(created)
    }

    async fn list_by_owner(&self, owner: &str) -> Result<Vec<EventMatch>> {
        let rules = self.rules.read().await;
        let mut owned: Vec<EventMatch> = rules
            .values()
            .filter(|r| r.owner == owner && !r.is_deleted())
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn find_owned(&self, id: Uuid, owner: &str) -> Result<Option<EventMatch>> {
        Ok(self
            .get(id)
            .await
            .filter(|r| r.owner == owner && !r.is_deleted()))
    }

    async fn update(
        &self,
        id: Uuid,
        owner: &str,
        changes: &EventMatchChanges,
    ) -> Result<Option<EventMatch>> {
        let mut rules = self.rules.write().await;
        let Some(rule) = rules
            .get_mut(&id)
            .filter(|r| r.owner == owner && !r.is_deleted())
        else {
            return Ok(None);
        };

        if let Some(name) = &changes.name {
            rule.name = name.clone();
        }
        if let Some(jsonpath) = &changes.jsonpath {
            rule.jsonpath = jsonpath.clone();
        }
        if let Some(target_url) = &changes.target_url {
            rule.target_url = target_url.clone();
        }
        if let Some(auth) = &changes.auth {
            rule.auth = auth.clone();
        }
        if let Some(extensions) = &changes.extensions {
            rule.extensions = extensions.clone();
        }
        match changes.disabled {
            Some(true) => {
                rule.disabled_at.get_or_insert_with(Utc::now);
                rule.disable_reason
                    .get_or_insert_with(|| "disabled by owner".to_string());
            }
            Some(false) => {
                rule.disabled_at = None;
                rule.disable_reason = None;
            }
            None => {}
        }
        rule.updated_at = Utc::now();

        Ok(Some(rule.clone()))
    }

    async fn soft_delete(&self, id: Uuid, owner: &str) -> Result<bool> {
        let mut rules = self.rules.write().await;
        match rules
            .get_mut(&id)
            .filter(|r| r.owner == owner && !r.is_deleted())
        {
            Some(rule) => {
                let now = Utc::now();
                rule.deleted_at = Some(now);
                rule.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Default)]
pub struct InMemoryEventLogRepository {
    events: RwLock<HashMap<Uuid, EventLog>>,
    matches: RwLock<Vec<EventLogMatch>>,
}

impl InMemoryEventLogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 所有处理记录，按创建顺序
    pub async fn all_matches(&self) -> Vec<EventLogMatch> {
        self.matches.read().await.clone()
    }
}

#[async_trait]
impl EventLogRepositoryTrait for InMemoryEventLogRepository {
    async fn create_event(&self, payload: &Value) -> Result<EventLog> {
        let log = EventLog {
            id: Uuid::now_v7(),
            received_payload: payload.clone(),
            received_at: Utc::now(),
        };
        self.events.write().await.insert(log.id, log.clone());
        Ok(log)
    }

    async fn get_event(&self, id: Uuid) -> Result<Option<EventLog>> {
        Ok(self.events.read().await.get(&id).cloned())
    }

    async fn create_match(&self, record: &NewEventLogMatch) -> Result<EventLogMatch> {
        let now = Utc::now();
        let created = EventLogMatch {
            id: Uuid::now_v7(),
            event_log_id: record.event_log_id,
            rule_id: record.rule_id,
            policy_status_code: record.policy_status_code,
            policy_response_body: record.policy_response_body.clone(),
            target_status_code: None,
            target_response_body: None,
            created_at: now,
            updated_at: now,
        };
        self.matches.write().await.push(created.clone());
        Ok(created)
    }

    async fn record_target(&self, match_id: Uuid, status_code: i32, body: &str) -> Result<bool> {
        let mut matches = self.matches.write().await;
        match matches
            .iter_mut()
            .find(|m| m.id == match_id && m.target_status_code.is_none())
        {
            Some(record) => {
                record.target_status_code = Some(status_code);
                record.target_response_body = Some(body.to_string());
                record.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_matches(&self, event_log_id: Uuid) -> Result<Vec<EventLogMatch>> {
        Ok(self
            .matches
            .read()
            .await
            .iter()
            .filter(|m| m.event_log_id == event_log_id)
            .cloned()
            .collect())
    }
}
