use axum::{Router, extract::FromRef, http::HeaderName};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod counters;
pub mod credentials;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use auth::{TokenIssuer, TokenState};
pub use config::AppConfig;
pub use counters::CounterEngine;
pub use credentials::CredentialStore;
pub use error::AppError;
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and `ToSchema` model into the OpenAPI
/// document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::auth::login,
        handlers::authors::create_author, handlers::authors::list_authors,
        handlers::authors::update_author, handlers::authors::delete_author,
        handlers::authors::get_author_profile, handlers::authors::get_my_profile,
        handlers::authors::update_my_profile,
        handlers::posts::list_posts, handlers::posts::get_post_detail,
        handlers::posts::list_editable_posts, handlers::posts::create_post,
        handlers::posts::update_post, handlers::posts::delete_post,
        handlers::comments::submit_comment,
        handlers::taxonomy::list_public_categories, handlers::taxonomy::list_subcategories,
        handlers::taxonomy::list_categories, handlers::taxonomy::create_category,
        handlers::taxonomy::update_category, handlers::taxonomy::delete_category,
        handlers::taxonomy::list_popular_tags, handlers::taxonomy::list_tags,
        handlers::taxonomy::create_tag, handlers::taxonomy::update_tag,
        handlers::taxonomy::delete_tag
    ),
    components(
        schemas(
            models::Role, models::PostStatus, models::SocialLinks, models::Author,
            models::PublicAuthorProfile, models::Subcategory, models::Category,
            models::CategorySummary, models::Tag, models::AuthorSnapshot, models::TagSnapshot,
            models::BlogPost, models::PostDetail, models::Comment,
            models::CreateAuthorRequest, models::UpdateAuthorRequest, models::LoginRequest,
            models::LoginUser, models::LoginResponse, models::CreateCategoryRequest,
            models::UpdateCategoryRequest, models::CreateTagRequest, models::UpdateTagRequest,
            models::CreatePostRequest, models::UpdatePostRequest, models::SubmitCommentRequest,
            models::CommentSubmitted, handlers::HealthStatus,
        )
    ),
    tags(
        (name = "blog-cms", description = "Blog CMS API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// The single shared state container. Every service is cheap to clone (reference
/// counted) and immutable after startup.
#[derive(Clone)]
pub struct AppState {
    /// Persistence layer (Postgres in production, in-memory in tests).
    pub repo: RepositoryState,
    /// Bearer token signer/verifier.
    pub tokens: TokenState,
    /// Author accounts and password hashing.
    pub credentials: CredentialStore,
    /// Denormalized counter maintenance.
    pub counters: CounterEngine,
    pub config: AppConfig,
}

impl AppState {
    /// Wires every service over one repository and configuration.
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        Self {
            tokens: Arc::new(TokenIssuer::new(&config.jwt_secret)),
            credentials: CredentialStore::new(repo.clone(), config.bcrypt_cost)
                .with_admin_email(&config.admin.email),
            counters: CounterEngine::new(repo.clone()),
            repo,
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

// Lets the guard extractors pull exactly the services they need from the shared state.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for TokenState {
    fn from_ref(app_state: &AppState) -> TokenState {
        app_state.tokens.clone()
    }
}

/// create_router
///
/// Assembles the routing table, registers the state and wraps everything in the
/// observability and CORS layers.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    // Guards are extractors on the handlers, so the three route groups merge flat.
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(authenticated::authenticated_routes())
        .merge(admin::admin_routes())
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Generate a UUID request id for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. One tracing span per request, tagged with the request id.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Echo the request id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request span from the method, URI and `x-request-id` header so every
/// log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
