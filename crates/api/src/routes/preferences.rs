//! Preferences pass-through handlers.
//!
//! The blob is opaque UI configuration; the server stores and returns it
//! without interpreting any field.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PreferencesQuery {
    pub email: String,
}

/// GET /preferences?email=
pub async fn get_preferences(
    State(state): State<AppState>,
    Query(query): Query<PreferencesQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let record = state
        .ledger
        .identity
        .resolve(&query.email)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no customer for {}", query.email)))?;

    let preferences = state
        .ledger
        .store
        .preferences(&record.customer_id)
        .await?
        .unwrap_or_else(|| serde_json::json!({}));

    Ok(Json(preferences))
}

#[derive(Debug, Deserialize)]
pub struct SetPreferencesRequest {
    pub email: String,
    pub preferences: serde_json::Value,
}

/// POST /preferences
pub async fn set_preferences(
    State(state): State<AppState>,
    Json(req): Json<SetPreferencesRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let record = state
        .ledger
        .identity
        .resolve(&req.email)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no customer for {}", req.email)))?;

    state
        .ledger
        .store
        .set_preferences(&record.customer_id, &req.preferences)
        .await?;

    Ok(Json(serde_json::json!({ "success": true })))
}
