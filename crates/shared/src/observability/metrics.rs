//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::ObservabilityConfig;

/// 全局 Prometheus handle，用于渲染指标
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics 资源守卫
pub struct MetricsHandle {
    _server_handle: tokio::task::JoinHandle<()>,
}

/// 初始化 Prometheus 指标导出
///
/// 启动一个独立的 HTTP 服务器在指定端口暴露 `/metrics` 端点。
pub async fn init(config: &ObservabilityConfig) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    let _ = PROMETHEUS_HANDLE.set(handle.clone());

    register_common_metrics(&config.service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle {
        _server_handle: server_handle,
    })
}

/// 注册通用指标描述
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!("http_requests_total", "Total number of HTTP requests");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    metrics::describe_counter!("events_received_total", "Total number of ingested events");
    metrics::describe_counter!(
        "rule_matches_total",
        "Total number of rules whose path expression matched an event"
    );
    metrics::describe_counter!(
        "policy_queries_total",
        "Total number of policy queries by response class"
    );
    metrics::describe_counter!(
        "deliveries_total",
        "Total number of webhook deliveries by response class"
    );
    metrics::describe_counter!(
        "rules_disabled_total",
        "Total number of rules auto-disabled by pipeline stage"
    );
    metrics::describe_histogram!(
        "dispatch_duration_seconds",
        "Duration of one event dispatch cycle in seconds"
    );

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

/// 启动指标 HTTP 服务器
async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(server_handle)
}

/// 获取全局 Prometheus handle
pub fn get_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

// ============================================================================
// 指标记录函数
// ============================================================================

/// 记录 HTTP 请求
#[inline]
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str.clone()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str
    )
    .record(duration_secs);
}

/// 记录接收到的事件
#[inline]
pub fn record_event_received() {
    metrics::counter!("events_received_total").increment(1);
}

/// 记录一次分发周期
#[inline]
pub fn record_dispatch(matched_rules: usize, duration_secs: f64) {
    metrics::counter!("rule_matches_total").increment(matched_rules as u64);
    metrics::histogram!("dispatch_duration_seconds").record(duration_secs);
}

/// 记录策略查询结果，class 为响应分类或 transport
#[inline]
pub fn record_policy_query(class: &str) {
    metrics::counter!("policy_queries_total", "class" => class.to_string()).increment(1);
}

/// 记录投递结果，class 为响应分类或 transport
#[inline]
pub fn record_delivery(class: &str) {
    metrics::counter!("deliveries_total", "class" => class.to_string()).increment(1);
}

/// 记录规则自动禁用，stage 为 authorize 或 route
#[inline]
pub fn record_rule_disabled(stage: &str) {
    metrics::counter!("rules_disabled_total", "stage" => stage.to_string()).increment(1);
}
