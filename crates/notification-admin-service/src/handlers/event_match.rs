//! 订阅规则 API 处理器
//!
//! 规则的增删改查，所有操作限定在调用方身份名下；
//! 其他用户的规则一律按不存在处理。

use axum::{
    Json,
    extract::{Path, State},
};
use notification_service::models::EventMatchChanges;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{ApiResponse, CreateEventMatchRequest, EventMatchDto, UpdateEventMatchRequest},
    error::{AdminError, Result},
    identity::CallerIdentity,
    state::AppState,
};

/// 创建规则
///
/// POST /eventmatch
pub async fn create_event_match(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Json(req): Json<CreateEventMatchRequest>,
) -> Result<Json<ApiResponse<EventMatchDto>>> {
    req.validate()?;
    rule_matcher::validate(&req.jsonpath)?;

    let rule = state
        .rules
        .create(&req.into_new_rule(caller.as_str()))
        .await?;

    info!(rule_id = %rule.id, owner = %rule.owner, "规则已创建");
    Ok(Json(ApiResponse::success(rule.into())))
}

/// 列出调用方的规则
///
/// GET /eventmatch
pub async fn list_event_matches(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<ApiResponse<Vec<EventMatchDto>>>> {
    let rules = state.rules.list_by_owner(caller.as_str()).await?;
    Ok(Json(ApiResponse::success(
        rules.into_iter().map(EventMatchDto::from).collect(),
    )))
}

/// 获取单条规则
///
/// GET /eventmatch/{id}
pub async fn get_event_match(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<EventMatchDto>>> {
    let rule = state
        .rules
        .find_owned(id, caller.as_str())
        .await?
        .ok_or(AdminError::RuleNotFound(id))?;

    Ok(Json(ApiResponse::success(rule.into())))
}

/// 更新规则
///
/// PUT /eventmatch/{id}
pub async fn update_event_match(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateEventMatchRequest>,
) -> Result<Json<ApiResponse<EventMatchDto>>> {
    req.validate()?;
    if let Some(jsonpath) = &req.jsonpath {
        rule_matcher::validate(jsonpath)?;
    }

    let changes = EventMatchChanges::from(req);
    let rule = state
        .rules
        .update(id, caller.as_str(), &changes)
        .await?
        .ok_or(AdminError::RuleNotFound(id))?;

    info!(
        rule_id = %rule.id,
        owner = %rule.owner,
        disabled = rule.is_disabled(),
        "规则已更新"
    );
    Ok(Json(ApiResponse::success(rule.into())))
}

/// 删除规则（软删除）
///
/// DELETE /eventmatch/{id}
pub async fn delete_event_match(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>> {
    if !state.rules.soft_delete(id, caller.as_str()).await? {
        return Err(AdminError::RuleNotFound(id));
    }

    info!(rule_id = %id, owner = %caller.as_str(), "规则已删除");
    Ok(Json(ApiResponse::<()>::success_empty()))
}
