//! Stripe webhook handler

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;

use crate::state::AppState;

/// POST /webhook
///
/// Takes the raw body so signature verification sees the exact bytes the
/// gateway signed; JSON parsing happens only after verification succeeds.
/// Verified events are always acknowledged with 200 so the gateway stops
/// redelivering; verification failures return 400.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let Some(sig_header) = headers.get("stripe-signature") else {
        tracing::warn!("Missing Stripe-Signature header");
        return Err(StatusCode::BAD_REQUEST);
    };

    let Ok(signature) = sig_header.to_str() else {
        tracing::warn!("Invalid Stripe-Signature header encoding");
        return Err(StatusCode::BAD_REQUEST);
    };

    match state.ledger.webhooks.handle(&body, signature).await {
        Ok(()) => Ok(Json(serde_json::json!({ "received": true }))),
        Err(bulkedit_ledger::LedgerError::SignatureInvalid) => {
            tracing::warn!("Webhook rejected: invalid signature");
            Err(StatusCode::BAD_REQUEST)
        }
        Err(e) => {
            // Post-verification failure (e.g. store unavailable): non-2xx so
            // the gateway redelivers once we recover.
            tracing::error!(error = ?e, "Webhook processing failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
