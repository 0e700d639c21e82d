use axum::{
    extract::FromRequestParts,
    http::{HeaderValue, Method, Request, StatusCode, header, request::Parts},
    response::IntoResponse,
};
use blog_cms::{
    AppState, MemoryRepository,
    auth::{
        ADMIN_ID, AdminClaims, AdminOnly, AuthError, AuthorOnly, Claims, EitherRole, Principal,
        RequiredRole, TokenError, TokenIssuer, token::TOKEN_TTL_SECS,
    },
    config::AppConfig,
    models::{Author, AuthorRecord, Role, SocialLinks},
    repository::Repository,
};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode, get_current_timestamp};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

const TEST_JWT_SECRET: &str = "auth-integration-test-secret";

// --- Helpers ---

fn create_app_state() -> AppState {
    let config = AppConfig {
        jwt_secret: TEST_JWT_SECRET.to_string(),
        ..AppConfig::default()
    };
    AppState::new(Arc::new(MemoryRepository::new()), config)
}

fn sample_author(email: &str, display_name: &str) -> Author {
    let now = Utc::now();
    Author {
        id: Uuid::new_v4(),
        email: email.to_string(),
        display_name: display_name.to_string(),
        title: None,
        bio: None,
        profile_image: None,
        social_links: SocialLinks::default(),
        created_at: now,
        updated_at: now,
    }
}

async fn seed_author(state: &AppState, email: &str, display_name: &str) -> Author {
    let author = sample_author(email, display_name);
    state
        .repo
        .insert_author(&AuthorRecord {
            author: author.clone(),
            password_hash: "not-a-real-hash".to_string(),
        })
        .await
        .unwrap();
    author
}

fn admin_principal() -> Principal {
    Principal::Admin(AdminClaims {
        id: ADMIN_ID,
        email: "admin@example.com".to_string(),
    })
}

/// Builds request parts with an optional raw `Authorization` header value.
fn request_parts(authorization: Option<&str>) -> Parts {
    let mut builder = Request::builder().method(Method::GET).uri("/");
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    let (parts, _) = builder.body(axum::body::Body::empty()).unwrap().into_parts();
    parts
}

fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

// --- Token Issuer/Verifier ---

#[test]
fn test_fresh_token_verifies_with_all_claims() {
    let issuer = TokenIssuer::new(TEST_JWT_SECRET);
    let author = sample_author("writer@blog.io", "Writer");

    let token = issuer.issue(&Principal::Author(author.clone())).unwrap();
    let claims = issuer.verify(&token).unwrap();

    assert_eq!(claims.sub, author.id);
    assert_eq!(claims.email, "writer@blog.io");
    assert_eq!(claims.role, Role::Author);
    assert_eq!(claims.display_name.as_deref(), Some("Writer"));
    assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
}

#[test]
fn test_admin_token_carries_sentinel_id_and_no_display_name() {
    let issuer = TokenIssuer::new(TEST_JWT_SECRET);

    let token = issuer.issue(&admin_principal()).unwrap();
    let claims = issuer.verify(&token).unwrap();

    assert_eq!(claims.sub, Uuid::nil());
    assert_eq!(claims.role, Role::Admin);
    assert_eq!(claims.display_name, None);
}

#[test]
fn test_expired_token_is_rejected_as_expired() {
    let issuer = TokenIssuer::new(TEST_JWT_SECRET);
    let now = get_current_timestamp();
    let claims = Claims {
        sub: Uuid::new_v4(),
        email: "late@blog.io".to_string(),
        role: Role::Author,
        display_name: None,
        iat: now - 7200,
        exp: now - 3600,
    };

    let token = issuer.sign(&claims).unwrap();

    assert_eq!(issuer.verify(&token), Err(TokenError::Expired));
}

#[test]
fn test_token_expired_one_second_ago_is_rejected() {
    let issuer = TokenIssuer::new(TEST_JWT_SECRET);
    let now = get_current_timestamp();
    let claims = Claims {
        sub: Uuid::new_v4(),
        email: "just-late@blog.io".to_string(),
        role: Role::Author,
        display_name: None,
        iat: now - TOKEN_TTL_SECS,
        exp: now - 1,
    };

    let token = issuer.sign(&claims).unwrap();

    assert_eq!(issuer.verify(&token), Err(TokenError::Expired));
}

#[test]
fn test_token_signed_with_another_key_is_invalid() {
    let issuer = TokenIssuer::new(TEST_JWT_SECRET);
    let foreign = TokenIssuer::new("some-other-secret");

    let token = foreign.issue(&admin_principal()).unwrap();

    assert_eq!(issuer.verify(&token), Err(TokenError::Invalid));
}

#[test]
fn test_token_with_unknown_role_is_invalid() {
    let now = get_current_timestamp();
    let payload = json!({
        "sub": Uuid::new_v4(),
        "email": "x@blog.io",
        "role": "editor",
        "iat": now,
        "exp": now + 3600,
    });
    let token = encode(
        &Header::default(),
        &payload,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap();

    let issuer = TokenIssuer::new(TEST_JWT_SECRET);
    assert_eq!(issuer.verify(&token), Err(TokenError::Invalid));
}

#[test]
fn test_garbage_token_is_invalid() {
    let issuer = TokenIssuer::new(TEST_JWT_SECRET);
    assert_eq!(issuer.verify("not.a.jwt"), Err(TokenError::Invalid));
}

#[test]
fn test_bearer_header_parsing() {
    let issuer = TokenIssuer::new(TEST_JWT_SECRET);
    let token = issuer.issue(&admin_principal()).unwrap();

    assert_eq!(issuer.verify_bearer(None), Err(TokenError::Missing));

    let basic = HeaderValue::from_static("Basic dXNlcjpwYXNz");
    assert_eq!(issuer.verify_bearer(Some(&basic)), Err(TokenError::Missing));

    let empty = HeaderValue::from_static("Bearer ");
    assert_eq!(issuer.verify_bearer(Some(&empty)), Err(TokenError::Missing));

    let good = HeaderValue::from_str(&bearer(&token)).unwrap();
    assert!(issuer.verify_bearer(Some(&good)).is_ok());
}

#[test]
fn test_required_role_admission_table() {
    assert!(RequiredRole::Admin.admits(Role::Admin));
    assert!(!RequiredRole::Admin.admits(Role::Author));
    assert!(RequiredRole::Author.admits(Role::Author));
    assert!(!RequiredRole::Author.admits(Role::Admin));
    assert!(RequiredRole::Either.admits(Role::Admin));
    assert!(RequiredRole::Either.admits(Role::Author));
}

// --- Guards ---

#[tokio::test]
async fn test_admin_only_accepts_admin_token() {
    let state = create_app_state();
    let token = state.tokens.issue(&admin_principal()).unwrap();

    let mut parts = request_parts(Some(&bearer(&token)));
    let AdminOnly(claims) = AdminOnly::from_request_parts(&mut parts, &state)
        .await
        .unwrap();

    assert_eq!(claims.id, ADMIN_ID);
    assert_eq!(claims.email, "admin@example.com");
}

#[tokio::test]
async fn test_admin_only_rejects_author_token_with_forbidden() {
    let state = create_app_state();
    let author = seed_author(&state, "writer@blog.io", "Writer").await;
    let token = state.tokens.issue(&Principal::Author(author)).unwrap();

    let mut parts = request_parts(Some(&bearer(&token)));
    let err = AdminOnly::from_request_parts(&mut parts, &state)
        .await
        .unwrap_err();

    assert_eq!(err, AuthError::Forbidden { actual: Role::Author });
    assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_missing_header_is_unauthorized_for_every_guard() {
    let state = create_app_state();

    let mut parts = request_parts(None);
    let admin = AdminOnly::from_request_parts(&mut parts, &state).await;
    let author = AuthorOnly::from_request_parts(&mut parts, &state).await;
    let either = EitherRole::from_request_parts(&mut parts, &state).await;

    for err in [admin.unwrap_err(), author.unwrap_err(), either.unwrap_err()] {
        assert_eq!(err, AuthError::Token(TokenError::Missing));
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn test_author_only_returns_live_author_record() {
    let state = create_app_state();
    let author = seed_author(&state, "writer@blog.io", "Old Name").await;
    let token = state.tokens.issue(&Principal::Author(author.clone())).unwrap();

    // Rename after the token was issued; the guard must see the new name.
    let mut record = state.repo.find_author(author.id).await.unwrap().unwrap();
    record.author.display_name = "New Name".to_string();
    state.repo.update_author(&record).await.unwrap();

    let mut parts = request_parts(Some(&bearer(&token)));
    let AuthorOnly(resolved) = AuthorOnly::from_request_parts(&mut parts, &state)
        .await
        .unwrap();

    assert_eq!(resolved.id, author.id);
    assert_eq!(resolved.display_name, "New Name");
}

#[tokio::test]
async fn test_author_only_rejects_deleted_author() {
    let state = create_app_state();
    let author = seed_author(&state, "gone@blog.io", "Gone").await;
    let token = state.tokens.issue(&Principal::Author(author.clone())).unwrap();
    state.repo.delete_author(author.id).await.unwrap();

    let mut parts = request_parts(Some(&bearer(&token)));
    let err = AuthorOnly::from_request_parts(&mut parts, &state)
        .await
        .unwrap_err();

    assert_eq!(err, AuthError::UnknownAccount);
    assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_author_only_rejects_admin_token_with_forbidden() {
    let state = create_app_state();
    let token = state.tokens.issue(&admin_principal()).unwrap();

    let mut parts = request_parts(Some(&bearer(&token)));
    let err = AuthorOnly::from_request_parts(&mut parts, &state)
        .await
        .unwrap_err();

    assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_either_role_resolves_both_roles() {
    let state = create_app_state();
    let author = seed_author(&state, "writer@blog.io", "Writer").await;

    let admin_token = state.tokens.issue(&admin_principal()).unwrap();
    let mut parts = request_parts(Some(&bearer(&admin_token)));
    let EitherRole(principal) = EitherRole::from_request_parts(&mut parts, &state)
        .await
        .unwrap();
    assert_eq!(principal.role(), Role::Admin);

    let author_token = state.tokens.issue(&Principal::Author(author.clone())).unwrap();
    let mut parts = request_parts(Some(&bearer(&author_token)));
    let EitherRole(principal) = EitherRole::from_request_parts(&mut parts, &state)
        .await
        .unwrap();
    assert_eq!(principal, Principal::Author(author));
}

#[tokio::test]
async fn test_expired_token_is_unauthorized_at_the_guard() {
    let state = create_app_state();
    let now = get_current_timestamp();
    let token = state
        .tokens
        .sign(&Claims {
            sub: ADMIN_ID,
            email: "admin@example.com".to_string(),
            role: Role::Admin,
            display_name: None,
            iat: now - 7200,
            exp: now - 3600,
        })
        .unwrap();

    let mut parts = request_parts(Some(&bearer(&token)));
    let err = EitherRole::from_request_parts(&mut parts, &state)
        .await
        .unwrap_err();

    assert_eq!(err, AuthError::Token(TokenError::Expired));
    assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
}
