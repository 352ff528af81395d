//! Quota consumption and the free/subscribed state machine.
//!
//! The decision rule is a pure function (`QuotaDecision::evaluate`) so the
//! state machine is testable without a database; the service methods apply
//! it through single atomic store operations.

use serde::Serialize;

use crate::customer::CustomerStore;
use crate::error::{LedgerError, LedgerResult};
use crate::identity::{normalize_email, IdentityService};

/// Outcome of evaluating the consumption rule against a customer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaDecision {
    /// Whether the requested actions may proceed.
    pub allowed: bool,
    /// Balance after consumption would be applied. Unchanged while
    /// subscribed; clamped at zero otherwise.
    pub balance_after: i32,
}

impl QuotaDecision {
    /// The consumption rule: subscribed customers always pass with their
    /// balance untouched; free customers pass while the balance covers the
    /// request, decrementing with a floor at zero.
    pub fn evaluate(subscribed: bool, remaining: i32, action_count: i32) -> Self {
        if subscribed {
            return Self {
                allowed: true,
                balance_after: remaining,
            };
        }

        Self {
            allowed: remaining >= action_count,
            balance_after: (remaining - action_count).max(0),
        }
    }
}

/// Result of an eligibility check or a consumption call.
#[derive(Debug, Clone, Serialize)]
pub struct QuotaStatus {
    pub subscribed: bool,
    pub free_actions_remaining: i32,
    pub allowed: bool,
}

/// Quota operations keyed by email.
#[derive(Clone)]
pub struct QuotaService {
    identity: IdentityService,
    store: CustomerStore,
    free_action_limit: i32,
}

impl QuotaService {
    pub fn new(identity: IdentityService, store: CustomerStore, free_action_limit: i32) -> Self {
        Self {
            identity,
            store,
            free_action_limit,
        }
    }

    /// The one place the "unset means full quota" rule lives.
    pub fn free_action_limit(&self) -> i32 {
        self.free_action_limit
    }

    fn validate_count(action_count: i32) -> LedgerResult<()> {
        if action_count < 1 {
            return Err(LedgerError::InvalidInput(format!(
                "action_count must be at least 1, got {action_count}"
            )));
        }
        Ok(())
    }

    /// Dry-run eligibility check. Resolves identity (creating a record for a
    /// first-time email) but never mutates quota state.
    pub async fn check_action(
        &self,
        raw_email: &str,
        action_count: i32,
    ) -> LedgerResult<QuotaStatus> {
        Self::validate_count(action_count)?;

        let record = self.identity.resolve_or_create(raw_email).await?;
        let decision = QuotaDecision::evaluate(
            record.subscribed,
            record.free_actions_remaining,
            action_count,
        );

        Ok(QuotaStatus {
            subscribed: record.subscribed,
            free_actions_remaining: record.free_actions_remaining,
            allowed: decision.allowed,
        })
    }

    /// Consume actions for an existing customer. The decrement happens as a
    /// single clamped update in the store, so concurrent calls cannot lose
    /// updates or drive the balance negative.
    pub async fn consume_actions(
        &self,
        raw_email: &str,
        action_count: i32,
    ) -> LedgerResult<QuotaStatus> {
        Self::validate_count(action_count)?;

        let record = self
            .identity
            .resolve(raw_email)
            .await?
            .ok_or_else(|| LedgerError::NotFound(raw_email.trim().to_ascii_lowercase()))?;

        let outcome = self
            .store
            .consume(&record.customer_id, action_count)
            .await?
            .ok_or_else(|| LedgerError::NotFound(record.customer_id.clone()))?;

        tracing::debug!(
            customer_id = %record.customer_id,
            action_count,
            remaining = outcome.free_actions_remaining,
            subscribed = outcome.subscribed,
            "Consumed actions"
        );

        Ok(QuotaStatus {
            subscribed: outcome.subscribed,
            free_actions_remaining: outcome.free_actions_remaining,
            allowed: true,
        })
    }

    /// Read-only projection of a customer's quota state. A never-seen email
    /// reports full quota without creating a record; this is a preview, not
    /// a reservation.
    pub async fn action_status(&self, raw_email: &str) -> LedgerResult<QuotaStatus> {
        let email = normalize_email(raw_email)?;

        match self.store.find_by_email(&email).await? {
            Some(record) => {
                let decision =
                    QuotaDecision::evaluate(record.subscribed, record.free_actions_remaining, 1);
                Ok(QuotaStatus {
                    subscribed: record.subscribed,
                    free_actions_remaining: record.free_actions_remaining,
                    allowed: decision.allowed,
                })
            }
            None => Ok(QuotaStatus {
                subscribed: false,
                free_actions_remaining: self.free_action_limit(),
                allowed: true,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_customer_allowed_while_balance_covers_request() {
        let d = QuotaDecision::evaluate(false, 50, 10);
        assert!(d.allowed);
        assert_eq!(d.balance_after, 40);
    }

    #[test]
    fn free_customer_denied_when_balance_short() {
        let d = QuotaDecision::evaluate(false, 5, 8);
        assert!(!d.allowed);
        assert_eq!(d.balance_after, 0, "decrement clamps at zero");
    }

    #[test]
    fn balance_never_goes_negative() {
        for remaining in 0..10 {
            for k in 1..20 {
                let d = QuotaDecision::evaluate(false, remaining, k);
                assert!(d.balance_after >= 0);
            }
        }
    }

    #[test]
    fn subscribed_customer_bypasses_quota() {
        let d = QuotaDecision::evaluate(true, 0, 1_000);
        assert!(d.allowed);
        assert_eq!(d.balance_after, 0, "balance untouched while subscribed");
    }

    #[test]
    fn exact_balance_is_allowed() {
        let d = QuotaDecision::evaluate(false, 10, 10);
        assert!(d.allowed);
        assert_eq!(d.balance_after, 0);
    }

    #[test]
    fn repeated_subscribed_consumption_is_stable() {
        let mut remaining = 42;
        for _ in 0..100 {
            let d = QuotaDecision::evaluate(true, remaining, 7);
            remaining = d.balance_after;
        }
        assert_eq!(remaining, 42);
    }
}
