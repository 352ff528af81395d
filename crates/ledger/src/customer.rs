//! Customer records and the atomic store operations behind the ledger.
//!
//! Every state change here is a single SQL statement. Concurrent requests
//! for the same customer are resolved by the database, never by
//! read-then-write in application code.

use serde::Serialize;
use sqlx::PgPool;
use time::OffsetDateTime;

use crate::error::LedgerResult;

/// One row of the customer ledger.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CustomerRecord {
    pub customer_id: String,
    pub subscribed: bool,
    pub free_actions_remaining: i32,
    pub plan: Option<String>,
    #[serde(skip)]
    pub created_at: OffsetDateTime,
    #[serde(skip)]
    pub last_action_at: Option<OffsetDateTime>,
}

/// Outcome of an atomic consume statement.
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct ConsumeOutcome {
    pub subscribed: bool,
    pub free_actions_remaining: i32,
}

/// Data access for the `customers` / `customer_emails` tables.
#[derive(Clone)]
pub struct CustomerStore {
    pool: PgPool,
}

impl CustomerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Look up the record owning a normalized email, if any.
    pub async fn find_by_email(&self, email: &str) -> LedgerResult<Option<CustomerRecord>> {
        let record = sqlx::query_as(
            r#"
            SELECT c.customer_id, c.subscribed, c.free_actions_remaining,
                   c.plan, c.created_at, c.last_action_at
            FROM customers c
            JOIN customer_emails e ON e.customer_id = c.customer_id
            WHERE e.email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn find_by_id(&self, customer_id: &str) -> LedgerResult<Option<CustomerRecord>> {
        let record = sqlx::query_as(
            r#"
            SELECT customer_id, subscribed, free_actions_remaining,
                   plan, created_at, last_action_at
            FROM customers
            WHERE customer_id = $1
            "#,
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Which customer currently owns an email alias, if any.
    pub async fn email_owner(&self, email: &str) -> LedgerResult<Option<String>> {
        let owner: Option<(String,)> =
            sqlx::query_as("SELECT customer_id FROM customer_emails WHERE email = $1")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;

        Ok(owner.map(|(id,)| id))
    }

    /// Insert a freshly provisioned record together with its first email
    /// alias. Returns `false` if a concurrent request claimed the email
    /// first; the transaction rolls back and nothing is committed.
    pub async fn insert_new(
        &self,
        customer_id: &str,
        email: &str,
        free_action_limit: i32,
    ) -> LedgerResult<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO customers (customer_id, subscribed, free_actions_remaining)
            VALUES ($1, FALSE, $2)
            ON CONFLICT (customer_id) DO NOTHING
            "#,
        )
        .bind(customer_id)
        .bind(free_action_limit)
        .execute(&mut *tx)
        .await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO customer_emails (email, customer_id)
            VALUES ($1, $2)
            ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(email)
        .bind(customer_id)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            // Lost the creation race. Roll back so no orphan row remains.
            tx.rollback().await?;
            return Ok(false);
        }

        tx.commit().await?;
        Ok(true)
    }

    /// Add an alias to an existing customer. Idempotent set-union: inserting
    /// an alias that already points at the same customer affects zero rows
    /// and is still a success. The caller guards against cross-customer
    /// conflicts before getting here.
    pub async fn add_email(&self, customer_id: &str, email: &str) -> LedgerResult<()> {
        sqlx::query(
            r#"
            INSERT INTO customer_emails (email, customer_id)
            VALUES ($1, $2)
            ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(email)
        .bind(customer_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Apply the consumption rule in one statement: subscribed rows keep
    /// their balance untouched, free rows decrement clamped at zero. Returns
    /// `None` for an unknown customer.
    pub async fn consume(
        &self,
        customer_id: &str,
        action_count: i32,
    ) -> LedgerResult<Option<ConsumeOutcome>> {
        let outcome = sqlx::query_as(
            r#"
            UPDATE customers
            SET free_actions_remaining = CASE
                    WHEN subscribed THEN free_actions_remaining
                    ELSE GREATEST(free_actions_remaining - $2, 0)
                END,
                last_action_at = NOW()
            WHERE customer_id = $1
            RETURNING subscribed, free_actions_remaining
            "#,
        )
        .bind(customer_id)
        .bind(action_count)
        .fetch_optional(&self.pool)
        .await?;

        Ok(outcome)
    }

    /// Flip the subscription flag. Idempotent; the free-action balance is
    /// never touched by subscription transitions. Returns `false` if the
    /// customer does not exist.
    pub async fn set_subscribed(
        &self,
        customer_id: &str,
        subscribed: bool,
        plan: Option<&str>,
    ) -> LedgerResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE customers
            SET subscribed = $2,
                plan = COALESCE($3, plan)
            WHERE customer_id = $1
            "#,
        )
        .bind(customer_id)
        .bind(subscribed)
        .bind(plan)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Opaque preferences blob, pass-through storage only.
    pub async fn preferences(&self, customer_id: &str) -> LedgerResult<Option<serde_json::Value>> {
        let row: Option<(serde_json::Value,)> =
            sqlx::query_as("SELECT preferences FROM customers WHERE customer_id = $1")
                .bind(customer_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(prefs,)| prefs))
    }

    pub async fn set_preferences(
        &self,
        customer_id: &str,
        preferences: &serde_json::Value,
    ) -> LedgerResult<bool> {
        let result = sqlx::query("UPDATE customers SET preferences = $2 WHERE customer_id = $1")
            .bind(customer_id)
            .bind(preferences)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
