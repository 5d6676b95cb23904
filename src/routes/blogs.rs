use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Blog Router Module
///
/// Reads are public. Every write requires an admin; `PUT /blogs` and
/// `POST /blogs/{blog_id}` are answered as unsupported.
pub fn blog_routes() -> Router<AppState> {
    Router::new()
        // GET    /blogs  list every blog (comment authors populated)
        // POST   /blogs  create a blog [admin]
        // PUT    /blogs  unsupported
        // DELETE /blogs  delete every blog [admin]
        .route(
            "/blogs",
            get(handlers::list_blogs)
                .post(handlers::create_blog)
                .put(handlers::unsupported)
                .delete(handlers::delete_blogs)
                .options(handlers::preflight),
        )
        // GET    /blogs/{blog_id}  fetch one blog
        // POST   /blogs/{blog_id}  unsupported
        // PUT    /blogs/{blog_id}  merge fields into the blog [admin]
        // DELETE /blogs/{blog_id}  delete the blog and its comments [admin]
        .route(
            "/blogs/{blog_id}",
            get(handlers::get_blog)
                .post(handlers::unsupported)
                .put(handlers::update_blog)
                .delete(handlers::delete_blog)
                .options(handlers::preflight),
        )
}
