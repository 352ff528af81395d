//! Stripe client wrapper and configuration.

use crate::error::{LedgerError, LedgerResult};

/// Stripe configuration loaded at startup.
#[derive(Clone)]
pub struct StripeConfig {
    /// Secret API key (`sk_live_...` / `sk_test_...`).
    pub secret_key: String,
    /// Webhook signing secret (`whsec_...`).
    pub webhook_secret: String,
    /// Price id of the subscription plan sold through checkout.
    pub price_id: String,
    /// Redirect target after a completed checkout.
    pub success_url: String,
    /// Redirect target after an abandoned checkout.
    pub cancel_url: String,
}

impl StripeConfig {
    /// Load Stripe configuration from environment variables.
    pub fn from_env() -> LedgerResult<Self> {
        let secret_key = require_var("STRIPE_SECRET_KEY")?;
        let webhook_secret = require_var("STRIPE_WEBHOOK_SECRET")?;
        let price_id = require_var("STRIPE_PRICE_ID")?;

        let success_url = std::env::var("CHECKOUT_SUCCESS_URL")
            .unwrap_or_else(|_| "https://bulkedit.app/success".to_string());
        let cancel_url = std::env::var("CHECKOUT_CANCEL_URL")
            .unwrap_or_else(|_| "https://bulkedit.app/cancel".to_string());

        Ok(Self {
            secret_key,
            webhook_secret,
            price_id,
            success_url,
            cancel_url,
        })
    }
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Keys and the webhook secret stay out of logs.
        f.debug_struct("StripeConfig")
            .field("price_id", &self.price_id)
            .field("success_url", &self.success_url)
            .field("cancel_url", &self.cancel_url)
            .finish_non_exhaustive()
    }
}

fn require_var(name: &str) -> LedgerResult<String> {
    std::env::var(name)
        .map_err(|_| LedgerError::Config(format!("missing environment variable {name}")))
}

/// Thin wrapper around the async-stripe client carrying our configuration.
#[derive(Clone)]
pub struct StripeClient {
    inner: stripe::Client,
    config: StripeConfig,
}

impl StripeClient {
    pub fn new(config: StripeConfig) -> Self {
        let inner = stripe::Client::new(config.secret_key.clone());
        Self { inner, config }
    }

    pub fn from_env() -> LedgerResult<Self> {
        Ok(Self::new(StripeConfig::from_env()?))
    }

    pub fn inner(&self) -> &stripe::Client {
        &self.inner
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }
}

impl std::fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never dump the secret key into logs.
        f.debug_struct("StripeClient")
            .field("price_id", &self.config.price_id)
            .finish_non_exhaustive()
    }
}
