//! Checkout and subscription lifecycle handlers.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub url: String,
}

/// POST /create-checkout
///
/// Provision an identity for the email if needed and return the hosted
/// checkout redirect URL.
pub async fn create_checkout(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> ApiResult<Json<CheckoutResponse>> {
    let url = state.ledger.subscriptions.create_checkout(&req.email).await?;
    Ok(Json(CheckoutResponse { url }))
}

#[derive(Debug, Serialize)]
pub struct ResolveCustomerResponse {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscribed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_actions_remaining: Option<i32>,
}

/// POST /resolve-customer
///
/// Read-only lookup; a miss reports `found: false` without provisioning.
pub async fn resolve_customer(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> ApiResult<Json<ResolveCustomerResponse>> {
    let response = match state.ledger.identity.resolve(&req.email).await? {
        Some(record) => ResolveCustomerResponse {
            found: true,
            customer_id: Some(record.customer_id),
            subscribed: Some(record.subscribed),
            free_actions_remaining: Some(record.free_actions_remaining),
        },
        None => ResolveCustomerResponse {
            found: false,
            customer_id: None,
            subscribed: None,
            free_actions_remaining: None,
        },
    };

    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct CheckSubscriptionQuery {
    pub customer_id: String,
}

#[derive(Debug, Serialize)]
pub struct CheckSubscriptionResponse {
    pub subscribed: bool,
    pub free_actions_remaining: i32,
}

/// GET /check-subscription?customer_id=
pub async fn check_subscription(
    State(state): State<AppState>,
    Query(query): Query<CheckSubscriptionQuery>,
) -> ApiResult<Json<CheckSubscriptionResponse>> {
    let status = state
        .ledger
        .subscriptions
        .check_subscription(&query.customer_id)
        .await?;

    Ok(Json(CheckSubscriptionResponse {
        subscribed: status.subscribed,
        free_actions_remaining: status.free_actions_remaining,
    }))
}

#[derive(Debug, Serialize)]
pub struct UnsubscribeResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// POST /unsubscribe
///
/// Cancels gateway subscriptions best-effort and always clears the local
/// flag; the free-action balance is preserved.
pub async fn unsubscribe(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> ApiResult<Json<UnsubscribeResponse>> {
    state.ledger.subscriptions.unsubscribe(&req.email).await?;

    Ok(Json(UnsubscribeResponse {
        success: true,
        message: Some("subscription cancelled".to_string()),
    }))
}

#[derive(Debug, Deserialize)]
pub struct LinkEmailRequest {
    pub customer_id: String,
    pub new_email: String,
}

#[derive(Debug, Serialize)]
pub struct LinkEmailResponse {
    pub success: bool,
}

/// POST /link-email
///
/// Adds an alias to an existing customer. Linking an email that already
/// belongs to a different customer is rejected with 409.
pub async fn link_email(
    State(state): State<AppState>,
    Json(req): Json<LinkEmailRequest>,
) -> ApiResult<Json<LinkEmailResponse>> {
    state
        .ledger
        .identity
        .link_email(&req.customer_id, &req.new_email)
        .await?;

    Ok(Json(LinkEmailResponse { success: true }))
}
