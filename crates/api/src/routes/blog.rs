//! Blog document handlers. Simple keyed CRUD against the `blog_posts`
//! table; unrelated to the customer ledger.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use time::OffsetDateTime;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct BlogPost {
    pub slug: String,
    pub title: String,
    pub body: String,
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: OffsetDateTime,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct BlogPostSummary {
    pub slug: String,
    pub title: String,
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: OffsetDateTime,
}

/// GET /api/blog
pub async fn list_posts(State(state): State<AppState>) -> ApiResult<Json<Vec<BlogPostSummary>>> {
    let posts = sqlx::query_as(
        "SELECT slug, title, published_at FROM blog_posts ORDER BY published_at DESC",
    )
    .fetch_all(&state.pool)
    .await
    .map_err(bulkedit_ledger::LedgerError::from)?;

    Ok(Json(posts))
}

/// GET /api/blog/{slug}
pub async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<BlogPost>> {
    let post: Option<BlogPost> =
        sqlx::query_as("SELECT slug, title, body, published_at FROM blog_posts WHERE slug = $1")
            .bind(&slug)
            .fetch_optional(&state.pool)
            .await
            .map_err(bulkedit_ledger::LedgerError::from)?;

    post.map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no blog post with slug {slug}")))
}
