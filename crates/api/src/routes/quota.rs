//! Free-action quota handlers.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::state::AppState;

fn default_action_count() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    pub email: String,
    #[serde(default = "default_action_count")]
    pub action_count: i32,
}

#[derive(Debug, Serialize)]
pub struct CheckActionResponse {
    pub allowed: bool,
    pub subscribed: bool,
    pub free_actions_remaining: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// POST /check-action
///
/// Dry-run eligibility check; never mutates quota state.
pub async fn check_action(
    State(state): State<AppState>,
    Json(req): Json<ActionRequest>,
) -> ApiResult<Json<CheckActionResponse>> {
    let status = state
        .ledger
        .quota
        .check_action(&req.email, req.action_count)
        .await?;

    let message = if status.allowed {
        None
    } else {
        Some(format!(
            "{} free actions remaining; subscribe to continue",
            status.free_actions_remaining
        ))
    };

    Ok(Json(CheckActionResponse {
        allowed: status.allowed,
        subscribed: status.subscribed,
        free_actions_remaining: status.free_actions_remaining,
        message,
    }))
}

#[derive(Debug, Serialize)]
pub struct ConsumeActionsResponse {
    pub success: bool,
    pub subscribed: bool,
    pub free_actions_remaining: i32,
}

/// POST /consume-actions
///
/// Applies the consumption rule atomically. Unlike the eligibility check,
/// the customer must already exist.
pub async fn consume_actions(
    State(state): State<AppState>,
    Json(req): Json<ActionRequest>,
) -> ApiResult<Json<ConsumeActionsResponse>> {
    let status = state
        .ledger
        .quota
        .consume_actions(&req.email, req.action_count)
        .await?;

    Ok(Json(ConsumeActionsResponse {
        success: true,
        subscribed: status.subscribed,
        free_actions_remaining: status.free_actions_remaining,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ActionStatusQuery {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct ActionStatusResponse {
    pub subscribed: bool,
    pub free_actions_remaining: i32,
    pub can_perform_action: bool,
}

/// GET /action-status?email=
///
/// Read-only projection. A never-seen email is reported as freshly
/// provisioned without creating a record.
pub async fn action_status(
    State(state): State<AppState>,
    Query(query): Query<ActionStatusQuery>,
) -> ApiResult<Json<ActionStatusResponse>> {
    let status = state.ledger.quota.action_status(&query.email).await?;

    Ok(Json(ActionStatusResponse {
        subscribed: status.subscribed,
        free_actions_remaining: status.free_actions_remaining,
        can_perform_action: status.allowed,
    }))
}
