//! Identity resolution: mapping email aliases to a single durable
//! payment-gateway identity.

use stripe::{CreateCustomer, Customer};

use crate::client::StripeClient;
use crate::customer::{CustomerRecord, CustomerStore};
use crate::error::{LedgerError, LedgerResult};

/// Normalize a raw email: trim, lower-case, and reject anything that does
/// not have a basic `local@domain` shape.
pub fn normalize_email(raw: &str) -> LedgerResult<String> {
    let email = raw.trim().to_ascii_lowercase();

    let invalid = || LedgerError::InvalidInput(format!("malformed email: {raw:?}"));

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || email.chars().any(char::is_whitespace)
    {
        return Err(invalid());
    }

    Ok(email)
}

/// Resolves email addresses to customer records, provisioning gateway
/// identities for first-time emails.
#[derive(Clone)]
pub struct IdentityService {
    stripe: StripeClient,
    store: CustomerStore,
    free_action_limit: i32,
}

impl IdentityService {
    pub fn new(stripe: StripeClient, store: CustomerStore, free_action_limit: i32) -> Self {
        Self {
            stripe,
            store,
            free_action_limit,
        }
    }

    /// Find the record owning this email, without creating one.
    pub async fn resolve(&self, raw_email: &str) -> LedgerResult<Option<CustomerRecord>> {
        let email = normalize_email(raw_email)?;
        self.store.find_by_email(&email).await
    }

    /// Find the record owning this email, creating a gateway identity and a
    /// fresh record if none exists.
    ///
    /// Creation is race-safe: the email alias carries a uniqueness
    /// constraint, so when two first-time requests collide exactly one
    /// insert commits and the loser re-resolves the winner's record.
    pub async fn resolve_or_create(&self, raw_email: &str) -> LedgerResult<CustomerRecord> {
        let email = normalize_email(raw_email)?;

        if let Some(record) = self.store.find_by_email(&email).await? {
            return Ok(record);
        }

        let params = CreateCustomer {
            email: Some(&email),
            ..Default::default()
        };
        let customer = Customer::create(self.stripe.inner(), params).await?;
        let customer_id = customer.id.to_string();

        if self
            .store
            .insert_new(&customer_id, &email, self.free_action_limit)
            .await?
        {
            tracing::info!(customer_id = %customer_id, "Provisioned new customer");
            return self
                .store
                .find_by_id(&customer_id)
                .await?
                .ok_or_else(|| LedgerError::NotFound(customer_id));
        }

        // Lost the race: another request created the record between our
        // lookup and insert. The unique email constraint guarantees exactly
        // one winner, so this lookup must succeed.
        tracing::debug!("Concurrent creation detected, re-resolving email");
        self.store
            .find_by_email(&email)
            .await?
            .ok_or_else(|| LedgerError::NotFound(email))
    }

    /// Link an additional email alias to an existing customer.
    ///
    /// Idempotent when the alias already points at the same customer; fails
    /// with `EmailConflict` when it belongs to a different one.
    pub async fn link_email(&self, customer_id: &str, raw_email: &str) -> LedgerResult<()> {
        let email = normalize_email(raw_email)?;

        if self.store.find_by_id(customer_id).await?.is_none() {
            return Err(LedgerError::NotFound(customer_id.to_string()));
        }

        match self.store.email_owner(&email).await? {
            Some(owner) if owner == customer_id => return Ok(()),
            Some(owner) => return Err(LedgerError::EmailConflict { email, owner }),
            None => {}
        }

        self.store.add_email(customer_id, &email).await?;

        // A concurrent link may have claimed the email between the owner
        // check and the insert; the conflict-free insert affects zero rows
        // in that case, so verify who actually owns it now.
        match self.store.email_owner(&email).await? {
            Some(owner) if owner == customer_id => {
                tracing::info!(customer_id = %customer_id, "Linked email alias");
                Ok(())
            }
            Some(owner) => Err(LedgerError::EmailConflict { email, owner }),
            None => Err(LedgerError::NotFound(customer_id.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_padding() {
        assert_eq!(
            normalize_email("  Alice@Example.COM ").unwrap(),
            "alice@example.com"
        );
    }

    #[test]
    fn accepts_plus_aliases_and_subdomains() {
        assert_eq!(
            normalize_email("a+tag@mail.example.co.uk").unwrap(),
            "a+tag@mail.example.co.uk"
        );
    }

    #[test]
    fn rejects_malformed_emails() {
        for raw in [
            "",
            "no-at-sign",
            "@example.com",
            "a@",
            "a@nodot",
            "a@.com",
            "a@com.",
            "two@@example.com",
            "a b@example.com",
        ] {
            assert!(
                matches!(normalize_email(raw), Err(LedgerError::InvalidInput(_))),
                "expected rejection for {raw:?}"
            );
        }
    }
}
