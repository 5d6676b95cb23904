//! Router Module Index
//!
//! One module per resource level. Access control lives in the handler
//! signatures: `AdminUser` for admin-only verbs, `AuthUser` for
//! author-gated ones, `Option<AuthUser>` where anonymous access is allowed.

use crate::AppState;
use axum::{Router, routing::get};

/// `/blogs` and `/blogs/{blog_id}`.
pub mod blogs;

/// `/blogs/{blog_id}/comments` and `/blogs/{blog_id}/comments/{comment_id}`.
pub mod comments;

/// All API routes plus the health check.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Unauthenticated liveness check for load balancers.
        .route("/health", get(|| async { "ok" }))
        .merge(blogs::blog_routes())
        .merge(comments::comment_routes())
}
