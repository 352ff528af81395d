//! Route registration.

use axum::routing::{get, post};
use axum::{Json, Router};

use crate::state::AppState;

mod billing;
mod blog;
mod pages;
mod preferences;
mod quota;
mod webhook;

/// Build the application router. Exact paths are preserved for
/// compatibility with deployed extension clients.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Checkout and subscription lifecycle
        .route("/create-checkout", post(billing::create_checkout))
        .route("/resolve-customer", post(billing::resolve_customer))
        .route("/check-subscription", get(billing::check_subscription))
        .route("/unsubscribe", post(billing::unsubscribe))
        .route("/link-email", post(billing::link_email))
        // Quota
        .route("/check-action", post(quota::check_action))
        .route("/consume-actions", post(quota::consume_actions))
        .route("/action-status", get(quota::action_status))
        // Gateway webhook (raw body - registered without JSON extraction)
        .route("/webhook", post(webhook::stripe_webhook))
        // Preferences pass-through
        .route(
            "/preferences",
            get(preferences::get_preferences).post(preferences::set_preferences),
        )
        // Blog
        .route("/api/blog", get(blog::list_posts))
        .route("/api/blog/{slug}", get(blog::get_post))
        // Static marketing/legal pages
        .route("/", get(pages::home))
        .route("/privacy", get(pages::privacy))
        .route("/terms", get(pages::terms))
        .route("/success", get(pages::checkout_success))
        .route("/cancel", get(pages::checkout_cancel))
        // Health
        .route("/health", get(health))
        .with_state(state)
}

/// GET /health - liveness probe.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
