//! Subscription lifecycle: hosted checkout, status reads, and unsubscribe.

use stripe::{
    CancelSubscription, CheckoutSession, CheckoutSessionMode, CreateCheckoutSession,
    CreateCheckoutSessionLineItems, CustomerId, ListSubscriptions, Subscription,
    SubscriptionStatus,
};

use crate::client::StripeClient;
use crate::customer::CustomerStore;
use crate::error::{LedgerError, LedgerResult};
use crate::identity::IdentityService;

/// Local view of a customer's subscription state.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SubscriptionStatusView {
    pub subscribed: bool,
    pub free_actions_remaining: i32,
}

/// Subscription operations. Gateway calls here are simple delegations; the
/// local ledger remains the source of truth for entitlement checks.
#[derive(Clone)]
pub struct SubscriptionService {
    stripe: StripeClient,
    store: CustomerStore,
    identity: IdentityService,
}

impl SubscriptionService {
    pub fn new(stripe: StripeClient, store: CustomerStore, identity: IdentityService) -> Self {
        Self {
            stripe,
            store,
            identity,
        }
    }

    /// Create a hosted subscription checkout session for this email,
    /// provisioning an identity first if needed. Returns the redirect URL.
    pub async fn create_checkout(&self, raw_email: &str) -> LedgerResult<String> {
        let record = self.identity.resolve_or_create(raw_email).await?;

        let customer_id: CustomerId = record
            .customer_id
            .parse()
            .map_err(|_| LedgerError::NotFound(record.customer_id.clone()))?;

        let config = self.stripe.config();
        let mut params = CreateCheckoutSession::new();
        params.customer = Some(customer_id);
        params.mode = Some(CheckoutSessionMode::Subscription);
        params.success_url = Some(&config.success_url);
        params.cancel_url = Some(&config.cancel_url);
        params.line_items = Some(vec![CreateCheckoutSessionLineItems {
            price: Some(config.price_id.clone()),
            quantity: Some(1),
            ..Default::default()
        }]);

        let session = CheckoutSession::create(self.stripe.inner(), params).await?;

        let url = session
            .url
            .ok_or_else(|| LedgerError::InvalidInput("checkout session has no URL".to_string()))?;

        tracing::info!(customer_id = %record.customer_id, "Created checkout session");
        Ok(url)
    }

    /// Local read of subscription state for a known customer id.
    pub async fn check_subscription(
        &self,
        customer_id: &str,
    ) -> LedgerResult<SubscriptionStatusView> {
        let record = self
            .store
            .find_by_id(customer_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(customer_id.to_string()))?;

        Ok(SubscriptionStatusView {
            subscribed: record.subscribed,
            free_actions_remaining: record.free_actions_remaining,
        })
    }

    /// Cancel any cancelable gateway subscriptions for this email, then
    /// unconditionally clear the local flag.
    ///
    /// Gateway failures are logged, not propagated: entitlement must not
    /// stay stuck "subscribed" because a cancel call timed out. The free
    /// balance is preserved across the transition.
    pub async fn unsubscribe(&self, raw_email: &str) -> LedgerResult<SubscriptionStatusView> {
        let record = self
            .identity
            .resolve(raw_email)
            .await?
            .ok_or_else(|| LedgerError::NotFound(raw_email.trim().to_ascii_lowercase()))?;

        if let Err(e) = self.cancel_gateway_subscriptions(&record.customer_id).await {
            tracing::warn!(
                customer_id = %record.customer_id,
                error = %e,
                "Gateway cancellation failed; clearing local subscription anyway"
            );
        }

        self.store
            .set_subscribed(&record.customer_id, false, None)
            .await?;

        tracing::info!(customer_id = %record.customer_id, "Customer unsubscribed");

        Ok(SubscriptionStatusView {
            subscribed: false,
            free_actions_remaining: record.free_actions_remaining,
        })
    }

    async fn cancel_gateway_subscriptions(&self, customer_id: &str) -> LedgerResult<()> {
        let parsed: CustomerId = customer_id
            .parse()
            .map_err(|_| LedgerError::NotFound(customer_id.to_string()))?;

        let params = ListSubscriptions {
            customer: Some(parsed),
            ..Default::default()
        };
        let subscriptions = Subscription::list(self.stripe.inner(), &params).await?;

        for sub in subscriptions.data {
            if matches!(
                sub.status,
                SubscriptionStatus::Canceled | SubscriptionStatus::IncompleteExpired
            ) {
                continue;
            }

            let cancel = CancelSubscription {
                cancellation_details: None,
                invoice_now: None,
                prorate: None,
            };
            Subscription::cancel(self.stripe.inner(), &sub.id, cancel).await?;
            tracing::info!(
                customer_id = %customer_id,
                subscription_id = %sub.id,
                "Cancelled gateway subscription"
            );
        }

        Ok(())
    }
}
