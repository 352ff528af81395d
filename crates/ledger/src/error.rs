//! Error types for the customer ledger.

/// Result alias used throughout the ledger crate.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors produced by ledger operations.
///
/// The API layer maps these onto HTTP statuses; nothing in this crate
/// partially commits state before returning an error variant.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Missing or malformed input (bad email shape, zero action count).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Startup configuration problem (missing or malformed environment
    /// variable). Never produced by request handling.
    #[error("configuration error: {0}")]
    Config(String),

    /// The operation requires a customer record that does not exist.
    #[error("customer not found: {0}")]
    NotFound(String),

    /// The email is already linked to a different customer identity.
    #[error("email {email} already belongs to customer {owner}")]
    EmailConflict { email: String, owner: String },

    /// Webhook signature verification failed. No state change may follow.
    #[error("webhook signature verification failed")]
    SignatureInvalid,

    /// Payment gateway call failed or timed out. Safe for the caller to retry.
    #[error("payment gateway error: {0}")]
    Gateway(#[from] stripe::StripeError),

    /// Document store call failed or timed out. Safe for the caller to retry.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
