use crate::{
    AppState,
    handlers::{authors, posts},
};
use axum::{
    Router,
    routing::{get, put},
};

/// Authenticated Router Module
///
/// Endpoints for signed-in editors. Post mutation admits both roles through the
/// `EitherRole` extractor and then applies the ownership policy in the handler, so an
/// author can only touch their own posts while an admin can touch any.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /admin/blog/posts lists posts in every status (authors: own only).
        // POST /admin/blog/posts creates a post and bumps category/tag counters.
        .route(
            "/admin/blog/posts",
            get(posts::list_editable_posts).post(posts::create_post),
        )
        // PUT/DELETE /admin/blog/posts/{id}
        // Owner-or-admin. Delete cascades comments and releases counters.
        .route(
            "/admin/blog/posts/{id}",
            put(posts::update_post).delete(posts::delete_post),
        )
        // GET/PUT /admin/profile
        // The requesting author's own account. Author tokens only.
        .route(
            "/admin/profile",
            get(authors::get_my_profile).put(authors::update_my_profile),
        )
}
