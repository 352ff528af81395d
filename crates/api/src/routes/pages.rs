//! Static marketing and legal pages.

use axum::response::Html;

const PAGE_STYLE: &str = r#"
    body { font-family: -apple-system, 'Segoe UI', sans-serif; max-width: 640px;
           margin: 4rem auto; padding: 0 1rem; color: #1a1a2e; line-height: 1.6; }
    h1 { font-size: 1.8rem; }
    a { color: #4361ee; }
"#;

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title} — BulkEdit</title>\n<style>{PAGE_STYLE}</style>\n</head>\n\
         <body>\n{body}\n</body>\n</html>"
    ))
}

/// GET /
pub async fn home() -> Html<String> {
    page(
        "BulkEdit",
        r#"<h1>BulkEdit</h1>
<p>Bulk-edit your browser data in one click. Install the extension, get your
free actions, and subscribe when you need more.</p>
<p><a href="/privacy">Privacy</a> · <a href="/terms">Terms</a></p>"#,
    )
}

/// GET /privacy
pub async fn privacy() -> Html<String> {
    page(
        "Privacy Policy",
        r#"<h1>Privacy Policy</h1>
<p>We store your email address, subscription state, and remaining free-action
balance. Payment details are handled entirely by our payment provider and
never touch our servers.</p>
<p>We do not sell or share your data with third parties.</p>"#,
    )
}

/// GET /terms
pub async fn terms() -> Html<String> {
    page(
        "Terms of Service",
        r#"<h1>Terms of Service</h1>
<p>Free accounts receive a limited number of bulk-edit actions. Subscribed
accounts receive unlimited actions for the duration of the subscription.
Subscriptions renew automatically and can be cancelled at any time.</p>"#,
    )
}

/// GET /success — checkout redirect target.
pub async fn checkout_success() -> Html<String> {
    page(
        "Subscribed",
        r#"<h1>You're subscribed 🎉</h1>
<p>Your subscription is active. Head back to the extension and keep editing —
no more action limits.</p>"#,
    )
}

/// GET /cancel — abandoned checkout redirect target.
pub async fn checkout_cancel() -> Html<String> {
    page(
        "Checkout cancelled",
        r#"<h1>Checkout cancelled</h1>
<p>No charge was made. Your remaining free actions are untouched; you can
subscribe any time from the extension.</p>"#,
    )
}
