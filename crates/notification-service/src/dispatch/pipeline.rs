//! 分发流水线
//!
//! 每个命中的规则独立经过 授权 -> 路由 两个阶段，规则之间并发执行、互不影响：
//! 一条规则的策略查询失败或投递失败只会禁用它自己。

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use notification_shared::observability::metrics;
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::auto_disable::{AutoDisablePolicy, FailureStage};
use super::classify::ResponseClass;
use super::client::{DeliveryClient, PolicyClient};
use super::matcher::{JsonPathMatcher, RuleMatcher};
use super::routing::merge_extensions;
use crate::error::{DispatchError, Result};
use crate::models::{EventLog, EventMatch, NewEventLogMatch};
use crate::repository::{EventLogRepositoryTrait, EventMatchRepositoryTrait};

/// 单条规则在一个分发周期中的终态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    /// 策略服务返回 4xx，拒绝投递
    Rejected { policy_status: u16 },
    /// 策略服务返回 5xx 或不可达，规则已禁用
    PolicyFailed { policy_status: Option<u16> },
    /// 策略服务返回 1xx/3xx，无法判定，不投递也不禁用
    PolicyUnrecognized { policy_status: u16 },
    Delivered { target_status: u16 },
    /// 投递未成功；4xx/5xx/传输失败会禁用规则，1xx/3xx 不会
    DeliveryFailed {
        target_status: Option<u16>,
        rule_disabled: bool,
    },
}

impl RuleOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }

    pub fn disabled_rule(&self) -> bool {
        matches!(
            self,
            Self::PolicyFailed { .. }
                | Self::DeliveryFailed {
                    rule_disabled: true,
                    ..
                }
        )
    }
}

/// 一个分发周期的汇总
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub event_log_id: Uuid,
    /// 参与匹配的可用规则数
    pub rules_evaluated: usize,
    pub outcomes: Vec<(Uuid, RuleOutcome)>,
    /// 处理中出现存储错误的规则
    pub failures: Vec<(Uuid, String)>,
}

impl DispatchReport {
    pub fn matched(&self) -> usize {
        self.outcomes.len() + self.failures.len()
    }

    pub fn outcome_for(&self, rule_id: Uuid) -> Option<&RuleOutcome> {
        self.outcomes
            .iter()
            .find(|(id, _)| *id == rule_id)
            .map(|(_, outcome)| outcome)
    }
}

/// 授权阶段的结果
enum Authorization {
    Granted { log_match_id: Uuid },
    Denied(RuleOutcome),
}

pub struct DispatchPipeline {
    rules: Arc<dyn EventMatchRepositoryTrait>,
    logs: Arc<dyn EventLogRepositoryTrait>,
    matcher: Arc<dyn RuleMatcher>,
    policy: Arc<dyn PolicyClient>,
    delivery: Arc<dyn DeliveryClient>,
    auto_disable: AutoDisablePolicy,
}

impl DispatchPipeline {
    pub fn new(
        rules: Arc<dyn EventMatchRepositoryTrait>,
        logs: Arc<dyn EventLogRepositoryTrait>,
        policy: Arc<dyn PolicyClient>,
        delivery: Arc<dyn DeliveryClient>,
    ) -> Self {
        Self {
            auto_disable: AutoDisablePolicy::new(rules.clone()),
            rules,
            logs,
            matcher: Arc::new(JsonPathMatcher),
            policy,
            delivery,
        }
    }

    /// 替换匹配实现
    pub fn with_matcher(mut self, matcher: Arc<dyn RuleMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    /// 记录接收到的事件
    ///
    /// 只做同步落库，分发由调用方另行调度。
    pub async fn ingest(&self, payload: &Value) -> Result<EventLog> {
        if !payload.is_object() {
            return Err(DispatchError::InvalidEvent);
        }

        let log = self.logs.create_event(payload).await?;
        metrics::record_event_received();
        info!(event_log_id = %log.id, "事件已记录");

        Ok(log)
    }

    /// 对已记录的事件执行一个分发周期
    #[instrument(skip(self))]
    pub async fn dispatch(&self, event_log_id: Uuid) -> Result<DispatchReport> {
        let log = self
            .logs
            .get_event(event_log_id)
            .await?
            .ok_or(DispatchError::EventLogNotFound(event_log_id))?;

        self.dispatch_event(&log).await
    }

    pub async fn dispatch_event(&self, log: &EventLog) -> Result<DispatchReport> {
        let start = Instant::now();
        let event = &log.received_payload;

        let rules = self.rules.find_eligible().await?;
        let rules_evaluated = rules.len();
        let matched = self.select_matching(rules, event);

        info!(
            event_log_id = %log.id,
            rules_evaluated,
            matched = matched.len(),
            "开始分发事件"
        );

        let results = join_all(matched.iter().map(|rule| async move {
            (rule.id, self.process_rule(log.id, rule, event).await)
        }))
        .await;

        let mut report = DispatchReport {
            event_log_id: log.id,
            rules_evaluated,
            ..Default::default()
        };
        for (rule_id, result) in results {
            match result {
                Ok(outcome) => report.outcomes.push((rule_id, outcome)),
                Err(e) => {
                    error!(rule_id = %rule_id, error = %e, "规则处理失败");
                    report.failures.push((rule_id, e.to_string()));
                }
            }
        }

        metrics::record_dispatch(report.matched(), start.elapsed().as_secs_f64());
        info!(
            event_log_id = %log.id,
            delivered = report.outcomes.iter().filter(|(_, o)| o.is_delivered()).count(),
            failures = report.failures.len(),
            "事件分发完成"
        );

        Ok(report)
    }

    /// 筛选命中的规则，只有可用规则才会交给匹配器
    fn select_matching(&self, rules: Vec<EventMatch>, event: &Value) -> Vec<EventMatch> {
        rules
            .into_iter()
            .filter(EventMatch::is_eligible)
            .filter(|rule| match self.matcher.matches(&rule.jsonpath, event) {
                Ok(hit) => hit,
                Err(e) => {
                    error!(rule_id = %rule.id, error = %e, "规则表达式无法解析，跳过");
                    false
                }
            })
            .collect()
    }

    #[instrument(skip(self, rule, event), fields(rule_id = %rule.id, owner = %rule.owner))]
    async fn process_rule(
        &self,
        event_log_id: Uuid,
        rule: &EventMatch,
        event: &Value,
    ) -> Result<RuleOutcome> {
        match self.authorize(event_log_id, rule, event).await? {
            Authorization::Granted { log_match_id } => self.route(log_match_id, rule, event).await,
            Authorization::Denied(outcome) => Ok(outcome),
        }
    }

    /// 授权：向策略服务查询规则所属用户能否接收该事件
    async fn authorize(
        &self,
        event_log_id: Uuid,
        rule: &EventMatch,
        event: &Value,
    ) -> Result<Authorization> {
        let reply = match self.policy.query(&rule.owner, event).await {
            Ok(reply) => reply,
            Err(e) => {
                metrics::record_policy_query("transport");
                self.auto_disable
                    .disable(rule.id, &e.to_string(), FailureStage::Authorize)
                    .await?;
                return Ok(Authorization::Denied(RuleOutcome::PolicyFailed {
                    policy_status: None,
                }));
            }
        };

        let class = reply.class();
        metrics::record_policy_query(class.as_str());

        let recorded = self
            .logs
            .create_match(&NewEventLogMatch {
                event_log_id,
                rule_id: rule.id,
                policy_status_code: i32::from(reply.status),
                policy_response_body: reply.body.clone(),
            })
            .await;

        // 审计写入失败也要先禁用规则，再返回存储错误
        if class == ResponseClass::ServerError {
            self.auto_disable
                .disable(rule.id, &reply.body, FailureStage::Authorize)
                .await?;
        }
        let log_match = recorded?;

        let authorization = match class {
            ResponseClass::Success => {
                debug!(status = reply.status, "策略服务允许投递");
                Authorization::Granted {
                    log_match_id: log_match.id,
                }
            }
            ResponseClass::ClientError => {
                info!(status = reply.status, "策略服务拒绝投递");
                Authorization::Denied(RuleOutcome::Rejected {
                    policy_status: reply.status,
                })
            }
            ResponseClass::ServerError => Authorization::Denied(RuleOutcome::PolicyFailed {
                policy_status: Some(reply.status),
            }),
            ResponseClass::Other => {
                warn!(status = reply.status, "策略服务返回无法识别的状态码，不投递");
                Authorization::Denied(RuleOutcome::PolicyUnrecognized {
                    policy_status: reply.status,
                })
            }
        };

        Ok(authorization)
    }

    /// 路由：合并扩展字段后投递到规则的 target_url
    async fn route(&self, log_match_id: Uuid, rule: &EventMatch, event: &Value) -> Result<RuleOutcome> {
        let routed = merge_extensions(event, &rule.extensions);

        let reply = match self
            .delivery
            .deliver(&rule.target_url, &rule.auth, &routed)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                metrics::record_delivery("transport");
                self.auto_disable
                    .disable(rule.id, &e.to_string(), FailureStage::Route)
                    .await?;
                return Ok(RuleOutcome::DeliveryFailed {
                    target_status: None,
                    rule_disabled: true,
                });
            }
        };

        let class = reply.class();
        metrics::record_delivery(class.as_str());

        let recorded = self
            .logs
            .record_target(log_match_id, i32::from(reply.status), &reply.body)
            .await;

        if class.is_failure() {
            self.auto_disable
                .disable(rule.id, &reply.body, FailureStage::Route)
                .await?;
        }
        recorded?;

        let outcome = match class {
            ResponseClass::Success => {
                info!(status = reply.status, target_url = %rule.target_url, "事件已投递");
                RuleOutcome::Delivered {
                    target_status: reply.status,
                }
            }
            ResponseClass::ClientError | ResponseClass::ServerError => RuleOutcome::DeliveryFailed {
                target_status: Some(reply.status),
                rule_disabled: true,
            },
            ResponseClass::Other => {
                warn!(status = reply.status, target_url = %rule.target_url, "投递目标返回非预期状态码");
                RuleOutcome::DeliveryFailed {
                    target_status: Some(reply.status),
                    rule_disabled: false,
                }
            }
        };

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::client::{HttpReply, MockDeliveryClient, MockPolicyClient, TransportError};
    use crate::dispatch::matcher::MockRuleMatcher;
    use crate::models::{BasicAuth, RuleAuth};
    use crate::models::EventLogMatch;
    use crate::repository::{
        InMemoryEventLogRepository, InMemoryEventMatchRepository, MockEventLogRepositoryTrait,
        MockEventMatchRepositoryTrait,
    };
    use notification_shared::error::NotificationError;
    use chrono::Utc;
    use serde_json::{Map, json};

    struct Fixture {
        rules: Arc<InMemoryEventMatchRepository>,
        logs: Arc<InMemoryEventLogRepository>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                rules: Arc::new(InMemoryEventMatchRepository::new()),
                logs: Arc::new(InMemoryEventLogRepository::new()),
            }
        }

        async fn add_rule(&self, owner: &str, jsonpath: &str) -> EventMatch {
            let now = Utc::now();
            let rule = EventMatch {
                id: Uuid::new_v4(),
                name: format!("{owner}-rule"),
                jsonpath: jsonpath.to_string(),
                owner: owner.to_string(),
                target_url: format!("http://{owner}.example/hook"),
                auth: RuleAuth::None,
                extensions: Map::new(),
                disabled_at: None,
                disable_reason: None,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            };
            self.rules.insert(rule.clone()).await;
            rule
        }

        fn pipeline(&self, policy: MockPolicyClient, delivery: MockDeliveryClient) -> DispatchPipeline {
            DispatchPipeline::new(
                self.rules.clone(),
                self.logs.clone(),
                Arc::new(policy),
                Arc::new(delivery),
            )
        }

        async fn ingest(&self, pipeline: &DispatchPipeline) -> EventLog {
            pipeline.ingest(&upload_event()).await.unwrap()
        }
    }

    fn upload_event() -> Value {
        json!({
            "specversion": "1.0",
            "type": "org.example.upload",
            "id": "evt-1",
            "data": [{"destinationTable": "Files", "value": "Blah"}],
            "extensions": {"region": "us"}
        })
    }

    fn policy_replying(status: u16, body: &'static str) -> MockPolicyClient {
        let mut policy = MockPolicyClient::new();
        policy
            .expect_query()
            .returning(move |_, _| Ok(HttpReply::new(status, body)));
        policy
    }

    fn delivery_replying(status: u16, body: &'static str) -> MockDeliveryClient {
        let mut delivery = MockDeliveryClient::new();
        delivery
            .expect_deliver()
            .returning(move |_, _, _| Ok(HttpReply::new(status, body)));
        delivery
    }

    fn no_delivery() -> MockDeliveryClient {
        let mut delivery = MockDeliveryClient::new();
        delivery.expect_deliver().times(0);
        delivery
    }

    const MATCHING: &str = "$.data[?(@.value == 'Blah')]";

    #[tokio::test]
    async fn test_happy_path_delivers_and_records() {
        let fx = Fixture::new();
        let rule = fx.add_rule("alice", MATCHING).await;

        let mut policy = MockPolicyClient::new();
        policy
            .expect_query()
            .withf(|owner, _| owner == "alice")
            .times(1)
            .returning(|_, _| Ok(HttpReply::new(200, "allowed")));

        let pipeline = fx.pipeline(policy, delivery_replying(202, "accepted"));
        let log = fx.ingest(&pipeline).await;
        let report = pipeline.dispatch(log.id).await.unwrap();

        assert_eq!(
            report.outcome_for(rule.id),
            Some(&RuleOutcome::Delivered { target_status: 202 })
        );

        let matches = fx.logs.list_matches(log.id).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].rule_id, rule.id);
        assert_eq!(matches[0].policy_status_code, 200);
        assert_eq!(matches[0].policy_response_body, "allowed");
        assert_eq!(matches[0].target_status_code, Some(202));
        assert_eq!(matches[0].target_response_body.as_deref(), Some("accepted"));
        assert!(fx.rules.get(rule.id).await.unwrap().is_eligible());
    }

    #[tokio::test]
    async fn test_non_matching_rule_never_queries_policy() {
        let fx = Fixture::new();
        fx.add_rule("alice", "$.data[?(@.value == 'Nope')]").await;

        let mut policy = MockPolicyClient::new();
        policy.expect_query().times(0);

        let pipeline = fx.pipeline(policy, no_delivery());
        let log = fx.ingest(&pipeline).await;
        let report = pipeline.dispatch(log.id).await.unwrap();

        assert_eq!(report.rules_evaluated, 1);
        assert_eq!(report.matched(), 0);
        assert!(fx.logs.all_matches().await.is_empty());
    }

    #[tokio::test]
    async fn test_ineligible_rules_never_reach_matcher() {
        let fx = Fixture::new();
        let now = Utc::now();
        let disabled = EventMatch {
            id: Uuid::new_v4(),
            name: "stale".into(),
            jsonpath: MATCHING.into(),
            owner: "alice".into(),
            target_url: "http://alice.example/hook".into(),
            auth: RuleAuth::None,
            extensions: Map::new(),
            disabled_at: Some(now),
            disable_reason: Some("HTTP 500".into()),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        let deleted = EventMatch {
            id: Uuid::new_v4(),
            disabled_at: None,
            deleted_at: Some(now),
            ..disabled.clone()
        };

        // 仓储即使返回了不可用规则，也不能交给匹配器
        let mut rules = MockEventMatchRepositoryTrait::new();
        rules
            .expect_find_eligible()
            .returning(move || Ok(vec![disabled.clone(), deleted.clone()]));
        let mut matcher = MockRuleMatcher::new();
        matcher.expect_matches().times(0);
        let mut policy = MockPolicyClient::new();
        policy.expect_query().times(0);

        let pipeline = DispatchPipeline::new(
            Arc::new(rules),
            fx.logs.clone(),
            Arc::new(policy),
            Arc::new(no_delivery()),
        )
        .with_matcher(Arc::new(matcher));

        let log = fx.ingest(&pipeline).await;
        let report = pipeline.dispatch(log.id).await.unwrap();
        assert_eq!(report.matched(), 0);
    }

    #[tokio::test]
    async fn test_policy_client_error_rejects_without_disabling() {
        let fx = Fixture::new();
        let rule = fx.add_rule("alice", MATCHING).await;

        let pipeline = fx.pipeline(policy_replying(403, "forbidden"), no_delivery());
        let log = fx.ingest(&pipeline).await;
        let report = pipeline.dispatch(log.id).await.unwrap();

        assert_eq!(
            report.outcome_for(rule.id),
            Some(&RuleOutcome::Rejected { policy_status: 403 })
        );
        let matches = fx.logs.list_matches(log.id).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].policy_status_code, 403);
        assert!(matches[0].target_status_code.is_none());
        assert!(fx.rules.get(rule.id).await.unwrap().is_eligible());
    }

    #[tokio::test]
    async fn test_policy_server_error_disables_with_body() {
        let fx = Fixture::new();
        let rule = fx.add_rule("alice", MATCHING).await;

        let pipeline = fx.pipeline(policy_replying(500, "policy exploded"), no_delivery());
        let log = fx.ingest(&pipeline).await;
        let report = pipeline.dispatch(log.id).await.unwrap();

        assert_eq!(
            report.outcome_for(rule.id),
            Some(&RuleOutcome::PolicyFailed {
                policy_status: Some(500)
            })
        );
        let stored = fx.rules.get(rule.id).await.unwrap();
        assert!(stored.is_disabled());
        assert_eq!(stored.disable_reason.as_deref(), Some("policy exploded"));

        let matches = fx.logs.list_matches(log.id).await.unwrap();
        assert_eq!(matches[0].policy_status_code, 500);
    }

    #[tokio::test]
    async fn test_policy_transport_failure_disables_without_match_record() {
        let fx = Fixture::new();
        let rule = fx.add_rule("alice", MATCHING).await;

        let mut policy = MockPolicyClient::new();
        policy
            .expect_query()
            .returning(|_, _| Err(TransportError("connection refused".into())));

        let pipeline = fx.pipeline(policy, no_delivery());
        let log = fx.ingest(&pipeline).await;
        let report = pipeline.dispatch(log.id).await.unwrap();

        assert_eq!(
            report.outcome_for(rule.id),
            Some(&RuleOutcome::PolicyFailed {
                policy_status: None
            })
        );
        let stored = fx.rules.get(rule.id).await.unwrap();
        assert_eq!(stored.disable_reason.as_deref(), Some("connection refused"));
        assert!(fx.logs.list_matches(log.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_policy_redirect_is_terminal_without_disable() {
        let fx = Fixture::new();
        let rule = fx.add_rule("alice", MATCHING).await;

        let pipeline = fx.pipeline(policy_replying(302, ""), no_delivery());
        let log = fx.ingest(&pipeline).await;
        let report = pipeline.dispatch(log.id).await.unwrap();

        assert_eq!(
            report.outcome_for(rule.id),
            Some(&RuleOutcome::PolicyUnrecognized { policy_status: 302 })
        );
        assert!(fx.rules.get(rule.id).await.unwrap().is_eligible());
        assert_eq!(fx.logs.list_matches(log.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delivery_server_error_records_and_disables() {
        let fx = Fixture::new();
        let rule = fx.add_rule("alice", MATCHING).await;

        let pipeline = fx.pipeline(policy_replying(200, "ok"), delivery_replying(503, "down"));
        let log = fx.ingest(&pipeline).await;
        let report = pipeline.dispatch(log.id).await.unwrap();

        assert_eq!(
            report.outcome_for(rule.id),
            Some(&RuleOutcome::DeliveryFailed {
                target_status: Some(503),
                rule_disabled: true
            })
        );
        let matches = fx.logs.list_matches(log.id).await.unwrap();
        assert_eq!(matches[0].target_status_code, Some(503));
        assert_eq!(matches[0].target_response_body.as_deref(), Some("down"));

        let stored = fx.rules.get(rule.id).await.unwrap();
        assert_eq!(stored.disable_reason.as_deref(), Some("down"));
    }

    #[tokio::test]
    async fn test_delivery_client_error_disables() {
        let fx = Fixture::new();
        let rule = fx.add_rule("alice", MATCHING).await;

        let pipeline = fx.pipeline(policy_replying(200, "ok"), delivery_replying(404, "no such hook"));
        let log = fx.ingest(&pipeline).await;
        pipeline.dispatch(log.id).await.unwrap();

        let stored = fx.rules.get(rule.id).await.unwrap();
        assert!(stored.is_disabled());
        assert_eq!(stored.disable_reason.as_deref(), Some("no such hook"));
    }

    #[tokio::test]
    async fn test_delivery_transport_failure_leaves_target_unset() {
        let fx = Fixture::new();
        let rule = fx.add_rule("alice", MATCHING).await;

        let mut delivery = MockDeliveryClient::new();
        delivery
            .expect_deliver()
            .returning(|_, _, _| Err(TransportError("request timed out".into())));

        let pipeline = fx.pipeline(policy_replying(200, "ok"), delivery);
        let log = fx.ingest(&pipeline).await;
        let report = pipeline.dispatch(log.id).await.unwrap();

        assert_eq!(
            report.outcome_for(rule.id),
            Some(&RuleOutcome::DeliveryFailed {
                target_status: None,
                rule_disabled: true
            })
        );
        let matches = fx.logs.list_matches(log.id).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert!(matches[0].target_status_code.is_none());
        assert!(matches[0].target_response_body.is_none());
        assert_eq!(
            fx.rules.get(rule.id).await.unwrap().disable_reason.as_deref(),
            Some("request timed out")
        );
    }

    #[tokio::test]
    async fn test_delivery_redirect_recorded_without_disable() {
        let fx = Fixture::new();
        let rule = fx.add_rule("alice", MATCHING).await;

        let pipeline = fx.pipeline(policy_replying(200, "ok"), delivery_replying(301, "moved"));
        let log = fx.ingest(&pipeline).await;
        let report = pipeline.dispatch(log.id).await.unwrap();

        assert_eq!(
            report.outcome_for(rule.id),
            Some(&RuleOutcome::DeliveryFailed {
                target_status: Some(301),
                rule_disabled: false
            })
        );
        assert!(fx.rules.get(rule.id).await.unwrap().is_eligible());
        let matches = fx.logs.list_matches(log.id).await.unwrap();
        assert_eq!(matches[0].target_status_code, Some(301));
    }

    #[tokio::test]
    async fn test_delivery_uses_rule_auth_and_merged_extensions() {
        let fx = Fixture::new();
        let now = Utc::now();
        let rule = EventMatch {
            id: Uuid::new_v4(),
            name: "with-auth".into(),
            jsonpath: MATCHING.into(),
            owner: "alice".into(),
            target_url: "http://alice.example/hook".into(),
            auth: RuleAuth::Basic {
                basic: BasicAuth {
                    username: "alice".into(),
                    password: "pw".into(),
                },
            },
            extensions: json!({"region": "eu", "tenant": "t1"})
                .as_object()
                .cloned()
                .unwrap(),
            disabled_at: None,
            disable_reason: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        fx.rules.insert(rule.clone()).await;

        let expected_auth = rule.auth.clone();
        let mut delivery = MockDeliveryClient::new();
        delivery
            .expect_deliver()
            .withf(move |url, auth, event| {
                url == "http://alice.example/hook"
                    && *auth == expected_auth
                    && event["extensions"] == json!({"region": "eu", "tenant": "t1"})
                    && event["id"] == "evt-1"
            })
            .times(1)
            .returning(|_, _, _| Ok(HttpReply::new(200, "")));

        // 策略查询使用未合并的原始事件
        let mut policy = MockPolicyClient::new();
        policy
            .expect_query()
            .withf(|_, event| event["extensions"] == json!({"region": "us"}))
            .times(1)
            .returning(|_, _| Ok(HttpReply::new(200, "")));

        let pipeline = fx.pipeline(policy, delivery);
        let log = fx.ingest(&pipeline).await;
        let report = pipeline.dispatch(log.id).await.unwrap();
        assert!(report.outcome_for(rule.id).unwrap().is_delivered());
    }

    fn failing_log_repo(log: EventLog) -> MockEventLogRepositoryTrait {
        let mut logs = MockEventLogRepositoryTrait::new();
        logs.expect_get_event()
            .returning(move |_| Ok(Some(log.clone())));
        logs.expect_create_match().returning(|record| {
            let now = Utc::now();
            Ok(EventLogMatch {
                id: Uuid::new_v4(),
                event_log_id: record.event_log_id,
                rule_id: record.rule_id,
                policy_status_code: record.policy_status_code,
                policy_response_body: record.policy_response_body.clone(),
                target_status_code: None,
                target_response_body: None,
                created_at: now,
                updated_at: now,
            })
        });
        logs.expect_record_target()
            .returning(|_, _, _| Err(NotificationError::Internal("db blip".into())));
        logs
    }

    fn stored_event() -> EventLog {
        EventLog {
            id: Uuid::new_v4(),
            received_payload: upload_event(),
            received_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_delivery_failure_disables_even_if_audit_write_fails() {
        let fx = Fixture::new();
        let rule = fx.add_rule("alice", MATCHING).await;
        let log = stored_event();

        let pipeline = DispatchPipeline::new(
            fx.rules.clone(),
            Arc::new(failing_log_repo(log.clone())),
            Arc::new(policy_replying(200, "ok")),
            Arc::new(delivery_replying(500, "target down")),
        );
        let report = pipeline.dispatch(log.id).await.unwrap();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, rule.id);
        let stored = fx.rules.get(rule.id).await.unwrap();
        assert!(stored.is_disabled());
        assert_eq!(stored.disable_reason.as_deref(), Some("target down"));
    }

    #[tokio::test]
    async fn test_policy_failure_disables_even_if_audit_write_fails() {
        let fx = Fixture::new();
        let rule = fx.add_rule("alice", MATCHING).await;
        let log = stored_event();

        let stored_log = log.clone();
        let mut logs = MockEventLogRepositoryTrait::new();
        logs.expect_get_event()
            .returning(move |_| Ok(Some(stored_log.clone())));
        logs.expect_create_match()
            .returning(|_| Err(NotificationError::Internal("db blip".into())));

        let pipeline = DispatchPipeline::new(
            fx.rules.clone(),
            Arc::new(logs),
            Arc::new(policy_replying(503, "policy down")),
            Arc::new(no_delivery()),
        );
        let report = pipeline.dispatch(log.id).await.unwrap();

        assert_eq!(report.failures.len(), 1);
        let stored = fx.rules.get(rule.id).await.unwrap();
        assert_eq!(stored.disable_reason.as_deref(), Some("policy down"));
    }

    #[tokio::test]
    async fn test_delivery_success_with_audit_failure_keeps_rule() {
        let fx = Fixture::new();
        let rule = fx.add_rule("alice", MATCHING).await;
        let log = stored_event();

        let pipeline = DispatchPipeline::new(
            fx.rules.clone(),
            Arc::new(failing_log_repo(log.clone())),
            Arc::new(policy_replying(200, "ok")),
            Arc::new(delivery_replying(200, "ok")),
        );
        let report = pipeline.dispatch(log.id).await.unwrap();

        assert_eq!(report.failures.len(), 1);
        assert!(fx.rules.get(rule.id).await.unwrap().is_eligible());
    }

    #[tokio::test]
    async fn test_same_owner_rules_each_query_policy() {
        let fx = Fixture::new();
        let first = fx.add_rule("alice", MATCHING).await;
        let second = fx.add_rule("alice", "$.extensions.region").await;

        let mut policy = MockPolicyClient::new();
        policy
            .expect_query()
            .withf(|owner, _| owner == "alice")
            .times(2)
            .returning(|_, _| Ok(HttpReply::new(200, "ok")));
        let mut delivery = MockDeliveryClient::new();
        delivery
            .expect_deliver()
            .times(2)
            .returning(|_, _, _| Ok(HttpReply::new(200, "ok")));

        let pipeline = fx.pipeline(policy, delivery);
        let log = fx.ingest(&pipeline).await;
        let report = pipeline.dispatch(log.id).await.unwrap();

        assert_eq!(report.matched(), 2);
        let matches = fx.logs.list_matches(log.id).await.unwrap();
        assert_eq!(matches.len(), 2);
        let mut rule_ids: Vec<Uuid> = matches.iter().map(|m| m.rule_id).collect();
        rule_ids.sort();
        let mut expected = vec![first.id, second.id];
        expected.sort();
        assert_eq!(rule_ids, expected);
    }

    #[tokio::test]
    async fn test_rules_are_isolated() {
        let fx = Fixture::new();
        let failing = fx.add_rule("broken", MATCHING).await;
        let healthy = fx.add_rule("alice", MATCHING).await;

        let mut policy = MockPolicyClient::new();
        policy.expect_query().returning(|owner, _| {
            if owner == "broken" {
                Ok(HttpReply::new(500, "boom"))
            } else {
                Ok(HttpReply::new(200, "ok"))
            }
        });
        let mut delivery = MockDeliveryClient::new();
        delivery
            .expect_deliver()
            .withf(|url, _, _| url == "http://alice.example/hook")
            .times(1)
            .returning(|_, _, _| Ok(HttpReply::new(200, "ok")));

        let pipeline = fx.pipeline(policy, delivery);
        let log = fx.ingest(&pipeline).await;
        let report = pipeline.dispatch(log.id).await.unwrap();

        assert_eq!(report.matched(), 2);
        assert!(report.outcome_for(failing.id).unwrap().disabled_rule());
        assert!(report.outcome_for(healthy.id).unwrap().is_delivered());
        assert!(fx.rules.get(failing.id).await.unwrap().is_disabled());
        assert!(fx.rules.get(healthy.id).await.unwrap().is_eligible());
    }

    #[tokio::test]
    async fn test_invalid_stored_expression_is_skipped() {
        let fx = Fixture::new();
        let broken = fx.add_rule("broken", "$[").await;
        let healthy = fx.add_rule("alice", MATCHING).await;

        let mut policy = MockPolicyClient::new();
        policy
            .expect_query()
            .withf(|owner, _| owner == "alice")
            .times(1)
            .returning(|_, _| Ok(HttpReply::new(200, "ok")));

        let pipeline = fx.pipeline(policy, delivery_replying(200, "ok"));
        let log = fx.ingest(&pipeline).await;
        let report = pipeline.dispatch(log.id).await.unwrap();

        assert_eq!(report.matched(), 1);
        assert!(report.outcome_for(healthy.id).is_some());
        assert!(fx.rules.get(broken.id).await.unwrap().is_eligible());
    }

    #[tokio::test]
    async fn test_disabled_rule_skipped_on_next_event() {
        let fx = Fixture::new();
        fx.add_rule("alice", MATCHING).await;

        let mut policy = MockPolicyClient::new();
        policy
            .expect_query()
            .times(1)
            .returning(|_, _| Ok(HttpReply::new(502, "bad gateway")));

        let pipeline = fx.pipeline(policy, no_delivery());
        let first = fx.ingest(&pipeline).await;
        pipeline.dispatch(first.id).await.unwrap();

        let second = fx.ingest(&pipeline).await;
        let report = pipeline.dispatch(second.id).await.unwrap();
        assert_eq!(report.rules_evaluated, 0);
        assert_eq!(report.matched(), 0);
    }

    #[tokio::test]
    async fn test_ingest_rejects_non_object() {
        let fx = Fixture::new();
        let pipeline = fx.pipeline(MockPolicyClient::new(), MockDeliveryClient::new());

        let err = pipeline.ingest(&json!(["not", "an", "object"])).await.unwrap_err();
        assert!(matches!(err, DispatchError::InvalidEvent));
    }

    #[tokio::test]
    async fn test_dispatch_unknown_event() {
        let fx = Fixture::new();
        let pipeline = fx.pipeline(MockPolicyClient::new(), MockDeliveryClient::new());

        let id = Uuid::new_v4();
        let err = pipeline.dispatch(id).await.unwrap_err();
        assert!(matches!(err, DispatchError::EventLogNotFound(missing) if missing == id));
    }
}
