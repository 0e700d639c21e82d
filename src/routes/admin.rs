use crate::{
    AppState,
    handlers::{auth, authors, taxonomy},
};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Admin Router Module
///
/// The admin console's account and taxonomy endpoints. Guards are per handler:
/// login and signup are public, taxonomy reads admit either role, and every other
/// endpoint here is admin-only.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // POST /admin/login
        // Unified login: configured admin credential first, then authors.
        .route("/admin/login", post(auth::login))
        // POST /admin/authors (public signup) and GET /admin/authors (admin listing).
        .route(
            "/admin/authors",
            post(authors::create_author).get(authors::list_authors),
        )
        // PUT/DELETE /admin/authors/{id}
        .route(
            "/admin/authors/{id}",
            put(authors::update_author).delete(authors::delete_author),
        )
        // --- Taxonomy ---
        // GET admits admins and authors (post editor pickers); writes are admin-only.
        .route(
            "/admin/categories",
            get(taxonomy::list_categories).post(taxonomy::create_category),
        )
        .route(
            "/admin/categories/{id}",
            put(taxonomy::update_category).delete(taxonomy::delete_category),
        )
        .route(
            "/admin/tags",
            get(taxonomy::list_tags).post(taxonomy::create_tag),
        )
        .route(
            "/admin/tags/{id}",
            put(taxonomy::update_tag).delete(taxonomy::delete_tag),
        )
}
