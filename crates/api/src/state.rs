//! Application state

use sqlx::PgPool;
use std::sync::Arc;

use bulkedit_ledger::LedgerService;

use crate::config::Config;

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    /// Customer ledger (identity, quota, subscriptions, webhooks).
    pub ledger: Arc<LedgerService>,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        let ledger = LedgerService::new(
            config.stripe.clone(),
            pool.clone(),
            config.free_action_limit,
        );
        tracing::info!(
            free_action_limit = config.free_action_limit,
            "Customer ledger initialized"
        );

        Self {
            pool,
            config: Arc::new(config),
            ledger: Arc::new(ledger),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
