//! Gateway webhook reconciliation.
//!
//! Signature verification runs over the raw request body bytes before any
//! JSON parsing: re-serialization can change byte layout and invalidate the
//! signature, so the bytes the gateway signed are the bytes we check.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use sqlx::PgPool;
use stripe::{Event, EventObject, EventType};
use subtle::ConstantTimeEq;
use time::OffsetDateTime;

use crate::customer::CustomerStore;
use crate::error::{LedgerError, LedgerResult};

type HmacSha256 = Hmac<Sha256>;

/// Redelivered events older than this are rejected outright.
const TIMESTAMP_TOLERANCE_SECS: i64 = 300;

/// Verify a `Stripe-Signature` header (`t=<ts>,v1=<hex>`) against the raw
/// payload bytes. `now` is injected so the tolerance window is testable.
pub fn verify_signature(
    payload: &[u8],
    signature_header: &str,
    webhook_secret: &str,
    now: i64,
) -> LedgerResult<()> {
    let mut timestamp: Option<i64> = None;
    let mut v1_signature: Option<&str> = None;

    for part in signature_header.split(',') {
        if let Some((key, value)) = part.split_once('=') {
            match key.trim() {
                "t" => timestamp = value.parse().ok(),
                "v1" => v1_signature = Some(value),
                _ => {}
            }
        }
    }

    let timestamp = timestamp.ok_or(LedgerError::SignatureInvalid)?;
    let v1_signature = v1_signature.ok_or(LedgerError::SignatureInvalid)?;

    if (now - timestamp).abs() > TIMESTAMP_TOLERANCE_SECS {
        tracing::warn!(
            timestamp,
            now,
            "Webhook timestamp outside tolerance window"
        );
        return Err(LedgerError::SignatureInvalid);
    }

    // The secret's "whsec_" prefix is not part of the signing key.
    let secret_key = webhook_secret
        .strip_prefix("whsec_")
        .unwrap_or(webhook_secret);

    let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
        .map_err(|_| LedgerError::SignatureInvalid)?;
    mac.update(format!("{timestamp}.").as_bytes());
    mac.update(payload);
    let computed = hex::encode(mac.finalize().into_bytes());

    if computed.as_bytes().ct_eq(v1_signature.as_bytes()).into() {
        Ok(())
    } else {
        tracing::warn!("Webhook signature mismatch");
        Err(LedgerError::SignatureInvalid)
    }
}

/// Applies verified gateway events to the ledger.
#[derive(Clone)]
pub struct WebhookHandler {
    store: CustomerStore,
    pool: PgPool,
    webhook_secret: String,
    price_id: String,
}

impl WebhookHandler {
    pub fn new(store: CustomerStore, pool: PgPool, webhook_secret: String, price_id: String) -> Self {
        Self {
            store,
            pool,
            webhook_secret,
            price_id,
        }
    }

    /// Verify, deduplicate, and apply one webhook delivery.
    ///
    /// Anything after successful verification is acknowledged (the gateway
    /// retries on non-2xx), including unknown event types and events for
    /// unknown customers.
    pub async fn handle(&self, payload: &[u8], signature_header: &str) -> LedgerResult<()> {
        verify_signature(
            payload,
            signature_header,
            &self.webhook_secret,
            OffsetDateTime::now_utc().unix_timestamp(),
        )?;

        // The signature already verified, so this is a genuine gateway
        // delivery either way. An event shape our model cannot deserialize
        // (newer API version, unknown event family) is acknowledged, not
        // retried forever.
        let event: Event = match serde_json::from_slice(payload) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "Verified webhook payload did not parse, acknowledging");
                return Ok(());
            }
        };

        if !self.claim_event(&event).await? {
            tracing::info!(event_id = %event.id, "Duplicate webhook delivery, already processed");
            return Ok(());
        }

        let event_id = event.id.to_string();
        let outcome = match &event.type_ {
            EventType::CheckoutSessionCompleted => self.handle_checkout_completed(event).await,
            EventType::CustomerSubscriptionDeleted => {
                self.handle_subscription_deleted(event).await
            }
            other => {
                tracing::info!(event_type = %other, event_id = %event_id, "Ignoring unhandled event type");
                Ok(())
            }
        };

        match outcome {
            Ok(()) => {
                self.record_result(&event_id, "success").await?;
                Ok(())
            }
            Err(e) => {
                // The claim row stays re-claimable, so the gateway's
                // redelivery retries the state change once the store
                // recovers. Recording the failure is best-effort.
                if let Err(record_err) = self.record_result(&event_id, "error").await {
                    tracing::warn!(
                        event_id = %event_id,
                        error = %record_err,
                        "Failed to record webhook processing error"
                    );
                }
                Err(e)
            }
        }
    }

    /// Claim an event id for processing. A row may be re-claimed until its
    /// result is `success`, so a delivery that failed mid-apply is retried
    /// on redelivery instead of being dropped. Returns `false` only for an
    /// event that already processed successfully.
    async fn claim_event(&self, event: &Event) -> LedgerResult<bool> {
        let claimed = sqlx::query(
            r#"
            INSERT INTO webhook_events (stripe_event_id, event_type, processing_result)
            VALUES ($1, $2, 'processing')
            ON CONFLICT (stripe_event_id) DO UPDATE
            SET processing_result = 'processing', processed_at = NOW()
            WHERE webhook_events.processing_result <> 'success'
            "#,
        )
        .bind(event.id.as_str())
        .bind(event.type_.to_string())
        .execute(&self.pool)
        .await?;

        Ok(claimed.rows_affected() > 0)
    }

    async fn record_result(&self, event_id: &str, result: &str) -> LedgerResult<()> {
        sqlx::query(
            r#"
            UPDATE webhook_events
            SET processing_result = $2, processed_at = NOW()
            WHERE stripe_event_id = $1
            "#,
        )
        .bind(event_id)
        .bind(result)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn handle_checkout_completed(&self, event: Event) -> LedgerResult<()> {
        let event_id = event.id.to_string();
        let session = match event.data.object {
            EventObject::CheckoutSession(session) => session,
            _ => {
                tracing::warn!(event_id = %event_id, "checkout.session.completed without a session object");
                return Ok(());
            }
        };

        if session.mode != stripe::CheckoutSessionMode::Subscription {
            tracing::info!(event_id = %event_id, "Ignoring non-subscription checkout");
            return Ok(());
        }

        let Some(customer_id) = session.customer.as_ref().map(|c| c.id().to_string()) else {
            tracing::warn!(event_id = %event_id, "Checkout session carries no customer id");
            return Ok(());
        };

        // Setting the flag twice converges to the same state, so a replay
        // that slips past the event-id claim is still harmless.
        let updated = self
            .store
            .set_subscribed(&customer_id, true, Some(&self.price_id))
            .await?;

        if updated {
            tracing::info!(customer_id = %customer_id, "Subscription activated via webhook");
        } else {
            // Records are gateway-initiated only; never create one here.
            tracing::warn!(
                customer_id = %customer_id,
                event_id = %event_id,
                "Checkout completed for unknown customer, ignoring"
            );
        }

        Ok(())
    }

    async fn handle_subscription_deleted(&self, event: Event) -> LedgerResult<()> {
        let event_id = event.id.to_string();
        let subscription = match event.data.object {
            EventObject::Subscription(subscription) => subscription,
            _ => {
                tracing::warn!(event_id = %event_id, "subscription.deleted without a subscription object");
                return Ok(());
            }
        };

        let customer_id = subscription.customer.id().to_string();

        let updated = self.store.set_subscribed(&customer_id, false, None).await?;
        if updated {
            tracing::info!(customer_id = %customer_id, "Subscription cleared via webhook");
        } else {
            tracing::warn!(
                customer_id = %customer_id,
                event_id = %event_id,
                "Subscription deleted for unknown customer, ignoring"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    const SECRET: &str = "whsec_test_secret_key";

    fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
        let key = secret.strip_prefix("whsec_").unwrap_or(secret);
        let mut mac = HmacSha256::new_from_slice(key.as_bytes()).unwrap();
        mac.update(format!("{timestamp}.").as_bytes());
        mac.update(payload);
        format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn accepts_valid_signature() {
        let payload = br#"{"id":"evt_1","type":"checkout.session.completed"}"#;
        let now = 1_700_000_000;
        let header = sign(payload, SECRET, now);
        assert!(verify_signature(payload, &header, SECRET, now).is_ok());
    }

    #[test]
    fn rejects_tampered_payload() {
        let payload = br#"{"id":"evt_1"}"#;
        let now = 1_700_000_000;
        let header = sign(payload, SECRET, now);
        let result = verify_signature(br#"{"id":"evt_2"}"#, &header, SECRET, now);
        assert!(matches!(result, Err(LedgerError::SignatureInvalid)));
    }

    #[test]
    fn rejects_wrong_secret() {
        let payload = br#"{"id":"evt_1"}"#;
        let now = 1_700_000_000;
        let header = sign(payload, "whsec_other_secret", now);
        let result = verify_signature(payload, &header, SECRET, now);
        assert!(matches!(result, Err(LedgerError::SignatureInvalid)));
    }

    #[test]
    fn rejects_stale_timestamp() {
        let payload = br#"{"id":"evt_1"}"#;
        let signed_at = 1_700_000_000;
        let header = sign(payload, SECRET, signed_at);
        let result = verify_signature(payload, &header, SECRET, signed_at + 301);
        assert!(matches!(result, Err(LedgerError::SignatureInvalid)));
    }

    #[test]
    fn accepts_timestamp_within_tolerance() {
        let payload = br#"{"id":"evt_1"}"#;
        let signed_at = 1_700_000_000;
        let header = sign(payload, SECRET, signed_at);
        assert!(verify_signature(payload, &header, SECRET, signed_at + 299).is_ok());
    }

    #[tokio::test]
    async fn acknowledges_verified_payload_that_does_not_parse() {
        // A correctly signed body our event model cannot deserialize must
        // be acked, not retried forever. The parse failure happens before
        // any store access, so a lazy pool never connects.
        let pool = PgPool::connect_lazy("postgres://localhost/unused").unwrap();
        let handler = WebhookHandler::new(
            CustomerStore::new(pool.clone()),
            pool,
            SECRET.to_string(),
            "price_1".to_string(),
        );

        let payload = br#"{"hello":"world"}"#;
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let header = sign(payload, SECRET, now);

        assert!(handler.handle(payload, &header).await.is_ok());
    }

    #[tokio::test]
    async fn rejects_unverified_payload_before_any_processing() {
        let pool = PgPool::connect_lazy("postgres://localhost/unused").unwrap();
        let handler = WebhookHandler::new(
            CustomerStore::new(pool.clone()),
            pool,
            SECRET.to_string(),
            "price_1".to_string(),
        );

        let payload = br#"{"hello":"world"}"#;
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let header = sign(payload, "whsec_other_secret", now);

        let result = handler.handle(payload, &header).await;
        assert!(matches!(result, Err(LedgerError::SignatureInvalid)));
    }

    #[test]
    fn rejects_malformed_headers() {
        let payload = b"{}";
        let now = 1_700_000_000;
        for header in ["", "v1=abc", "t=123", "garbage", "t=notanumber,v1=abc"] {
            let result = verify_signature(payload, header, SECRET, now);
            assert!(
                matches!(result, Err(LedgerError::SignatureInvalid)),
                "expected rejection for header {header:?}"
            );
        }
    }
}
