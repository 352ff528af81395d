#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! BulkEdit Customer Ledger
//!
//! Owns the mapping from email aliases to a single payment-gateway
//! identity, the free-action quota state machine, and reconciliation of
//! asynchronous gateway webhook events.
//!
//! ## Invariants
//!
//! - An email belongs to exactly one customer (unique alias constraint).
//! - `free_actions_remaining` never goes negative (clamped atomic update).
//! - Subscribed customers consume without decrementing their balance.
//! - Webhook application is idempotent (event-id claim + convergent flips).

pub mod client;
pub mod customer;
pub mod error;
pub mod identity;
pub mod quota;
pub mod subscription;
pub mod webhooks;

#[cfg(test)]
mod edge_case_tests;

pub use client::{StripeClient, StripeConfig};
pub use customer::{ConsumeOutcome, CustomerRecord, CustomerStore};
pub use error::{LedgerError, LedgerResult};
pub use identity::{normalize_email, IdentityService};
pub use quota::{QuotaDecision, QuotaService, QuotaStatus};
pub use subscription::{SubscriptionService, SubscriptionStatusView};
pub use webhooks::{verify_signature, WebhookHandler};

use sqlx::PgPool;

/// Default free-action balance granted to a freshly provisioned customer.
/// Overridable via `FREE_ACTION_LIMIT`; historical deployments used 50 or
/// 100, so this is configuration rather than a constant of the system.
pub const DEFAULT_FREE_ACTION_LIMIT: i32 = 50;

/// Aggregate ledger service wired into the API server at startup.
#[derive(Clone)]
pub struct LedgerService {
    pub store: CustomerStore,
    pub identity: IdentityService,
    pub quota: QuotaService,
    pub subscriptions: SubscriptionService,
    pub webhooks: WebhookHandler,
}

impl LedgerService {
    /// Build the service graph from explicit configuration.
    pub fn new(config: StripeConfig, pool: PgPool, free_action_limit: i32) -> Self {
        let stripe = StripeClient::new(config);
        let store = CustomerStore::new(pool.clone());
        let identity = IdentityService::new(stripe.clone(), store.clone(), free_action_limit);
        let quota = QuotaService::new(identity.clone(), store.clone(), free_action_limit);
        let subscriptions =
            SubscriptionService::new(stripe.clone(), store.clone(), identity.clone());
        let webhooks = WebhookHandler::new(
            store.clone(),
            pool,
            stripe.config().webhook_secret.clone(),
            stripe.config().price_id.clone(),
        );

        Self {
            store,
            identity,
            quota,
            subscriptions,
            webhooks,
        }
    }
}
