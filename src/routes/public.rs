use crate::{
    AppState,
    handlers::{self, authors, comments, posts, taxonomy},
};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints for anonymous readers of the website. Every post read path returns
/// published posts only; the repository applies that filter unconditionally.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for monitoring and load balancers.
        .route("/health", get(handlers::health))
        // GET /blog/posts?category=...&tag=...&featured=...
        // Published posts, newest first.
        .route("/blog/posts", get(posts::list_posts))
        // GET /blog/post/{post}
        // Detail view by slug, with category summary and comments.
        // Both post routes share the `{post}` parameter name so the router accepts them
        // side by side: a slug here, a post id below.
        .route("/blog/post/{post}", get(posts::get_post_detail))
        // POST /blog/post/{post}/comments
        // Reader comment submission by post id. Bumps the post's comment count.
        .route(
            "/blog/post/{post}/comments",
            post(comments::submit_comment),
        )
        // --- Sidebar widgets ---
        .route("/blog/categories", get(taxonomy::list_public_categories))
        .route(
            "/blog/categories/{id}/subcategories",
            get(taxonomy::list_subcategories),
        )
        .route("/blog/tags", get(taxonomy::list_popular_tags))
        .route("/blog/author/{id}", get(authors::get_author_profile))
}
