use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Comment Router Module
///
/// Comments are embedded in their blog, so every path is nested under
/// `/blogs/{blog_id}`. A missing blog is always a 404.
pub fn comment_routes() -> Router<AppState> {
    Router::new()
        // GET    .../comments  list the blog's comments
        // POST   .../comments  append a comment [user, or anonymous when enabled]
        // PUT    .../comments  unsupported
        // DELETE .../comments  remove every comment [admin]
        .route(
            "/blogs/{blog_id}/comments",
            get(handlers::get_comments)
                .post(handlers::add_comment)
                .put(handlers::unsupported)
                .delete(handlers::delete_comments)
                .options(handlers::preflight),
        )
        // GET    .../comments/{comment_id}  fetch one comment
        // POST   .../comments/{comment_id}  unsupported
        // PUT    .../comments/{comment_id}  edit rating/text [comment author]
        // DELETE .../comments/{comment_id}  remove the comment [comment author]
        .route(
            "/blogs/{blog_id}/comments/{comment_id}",
            get(handlers::get_comment)
                .post(handlers::unsupported)
                .put(handlers::update_comment)
                .delete(handlers::delete_comment)
                .options(handlers::preflight),
        )
}
