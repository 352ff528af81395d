//! Configuration for the API server.

use bulkedit_ledger::{StripeConfig, DEFAULT_FREE_ACTION_LIMIT};
use std::time::Duration;

/// Server configuration, loaded once at startup and injected into state.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to.
    pub bind_address: String,
    /// Database URL.
    pub database_url: String,
    /// Stripe configuration (keys, price, checkout URLs).
    pub stripe: StripeConfig,
    /// Free actions granted to a new customer. Historical deployments used
    /// 50 or 100; this is configuration, never a hard-coded constant.
    pub free_action_limit: i32,
    /// Per-request timeout applied to the router.
    pub request_timeout: Duration,
    /// Comma-separated CORS origin allowlist.
    pub allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let stripe = StripeConfig::from_env().map_err(|e| ConfigError::Stripe(e.to_string()))?;

        let free_action_limit = match std::env::var("FREE_ACTION_LIMIT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::Invalid("FREE_ACTION_LIMIT"))?,
            Err(_) => DEFAULT_FREE_ACTION_LIMIT,
        };
        if free_action_limit < 0 {
            return Err(ConfigError::Invalid("FREE_ACTION_LIMIT"));
        }

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("REQUEST_TIMEOUT_SECS"))?;

        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            bind_address,
            database_url,
            stripe,
            free_action_limit,
            request_timeout: Duration::from_secs(request_timeout_secs),
            allowed_origins,
        })
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Stripe configuration error: {0}")]
    Stripe(String),
}
