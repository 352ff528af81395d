//! Input validation tests
//!
//! Request-body contract and email boundary validation for the API handlers.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use bulkedit_ledger::normalize_email;
use serde::Deserialize;

fn default_action_count() -> i32 {
    1
}

/// Mirrors the handler's quota request contract for testing.
#[derive(Debug, Deserialize)]
struct ActionRequest {
    email: String,
    #[serde(default = "default_action_count")]
    action_count: i32,
}

/// Mirrors the handler's email-link request contract for testing.
#[derive(Debug, Deserialize)]
struct LinkEmailRequest {
    customer_id: String,
    new_email: String,
}

// ============================================================================
// Request Body Contracts
// ============================================================================

#[test]
fn action_count_defaults_to_one() {
    let req: ActionRequest = serde_json::from_str(r#"{"email":"user@example.com"}"#).unwrap();
    assert_eq!(req.action_count, 1);
    assert_eq!(req.email, "user@example.com");
}

#[test]
fn explicit_action_count_is_honored() {
    let req: ActionRequest =
        serde_json::from_str(r#"{"email":"user@example.com","action_count":25}"#).unwrap();
    assert_eq!(req.action_count, 25);
}

#[test]
fn missing_email_is_rejected() {
    let result: Result<ActionRequest, _> = serde_json::from_str(r#"{"action_count":3}"#);
    assert!(result.is_err());
}

#[test]
fn unknown_fields_are_tolerated() {
    // Extension clients of different vintages send extra fields.
    let req: ActionRequest =
        serde_json::from_str(r#"{"email":"user@example.com","client_version":"2.1.0"}"#).unwrap();
    assert_eq!(req.email, "user@example.com");
}

#[test]
fn fractional_action_count_is_rejected() {
    let result: Result<ActionRequest, _> =
        serde_json::from_str(r#"{"email":"user@example.com","action_count":1.5}"#);
    assert!(result.is_err());
}

#[test]
fn link_email_requires_both_fields() {
    let ok: LinkEmailRequest =
        serde_json::from_str(r#"{"customer_id":"cus_123","new_email":"alt@example.com"}"#).unwrap();
    assert_eq!(ok.customer_id, "cus_123");
    assert_eq!(ok.new_email, "alt@example.com");

    let missing: Result<LinkEmailRequest, _> = serde_json::from_str(r#"{"customer_id":"cus_123"}"#);
    assert!(missing.is_err());
}

// ============================================================================
// Email Boundary Validation
// ============================================================================

#[test]
fn valid_emails_normalize_to_canonical_form() {
    assert_eq!(
        normalize_email("  User@Example.COM ").unwrap(),
        "user@example.com"
    );
    assert_eq!(
        normalize_email("first.last+tag@sub.example.org").unwrap(),
        "first.last+tag@sub.example.org"
    );
}

#[test]
fn alias_variants_normalize_identically() {
    // Case and surrounding whitespace must not split one customer into two.
    let canonical = normalize_email("person@example.com").unwrap();
    for variant in ["PERSON@example.com", "person@EXAMPLE.COM", " person@example.com\n"] {
        assert_eq!(normalize_email(variant).unwrap(), canonical);
    }
}

#[test]
fn malformed_emails_are_rejected() {
    let invalid = [
        "",
        "   ",
        "no-at-sign",
        "@example.com",
        "user@",
        "user@nodot",
        "user@@example.com",
        "user@.example.com",
        "user@example.com.",
        "user name@example.com",
        "user@exa mple.com",
    ];

    for email in invalid {
        assert!(
            normalize_email(email).is_err(),
            "expected rejection for {email:?}"
        );
    }
}

#[test]
fn injection_attempts_are_rejected_as_emails() {
    // These never reach a query as identity keys.
    assert!(normalize_email("' OR 1=1 --").is_err());
    assert!(normalize_email("user@example.com; DROP TABLE customers").is_err());
}
