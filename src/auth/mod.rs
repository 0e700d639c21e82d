use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    config::AdminCredential,
    error::AppError,
    models::{Author, Role},
    repository::{Repository, RepositoryState, StoreError},
};

pub mod policy;
pub mod token;

pub use policy::can_mutate_post;
pub use token::{Claims, TokenError, TokenIssuer, TokenState};

/// Fixed subject id carried by admin tokens. Never collides with a generated author id.
pub const ADMIN_ID: Uuid = Uuid::nil();

/// AdminClaims
///
/// The resolved admin identity attached to admin-authorized requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminClaims {
    pub id: Uuid,
    pub email: String,
}

impl From<&AdminCredential> for AdminClaims {
    fn from(credential: &AdminCredential) -> Self {
        Self {
            id: ADMIN_ID,
            email: credential.email.clone(),
        }
    }
}

/// Principal
///
/// The authenticated actor behind a request. Admins are resolved from the token alone;
/// authors are always the live record re-read from the repository, so a deleted author's
/// outstanding tokens stop working immediately.
#[derive(Debug, Clone, PartialEq)]
pub enum Principal {
    Admin(AdminClaims),
    Author(Author),
}

impl Principal {
    pub fn role(&self) -> Role {
        match self {
            Principal::Admin(_) => Role::Admin,
            Principal::Author(_) => Role::Author,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Principal::Admin(admin) => admin.id,
            Principal::Author(author) => author.id,
        }
    }

    pub fn email(&self) -> &str {
        match self {
            Principal::Admin(admin) => &admin.email,
            Principal::Author(author) => &author.email,
        }
    }

    pub fn display_name(&self) -> Option<&str> {
        match self {
            Principal::Admin(_) => None,
            Principal::Author(author) => Some(&author.display_name),
        }
    }
}

/// RequiredRole
///
/// The role parameter of the single verification primitive `authorize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredRole {
    Admin,
    Author,
    Either,
}

impl RequiredRole {
    pub fn admits(self, role: Role) -> bool {
        match self {
            RequiredRole::Admin => role == Role::Admin,
            RequiredRole::Author => role == Role::Author,
            RequiredRole::Either => true,
        }
    }
}

/// AuthError
///
/// Guard failures. Everything except a role mismatch (403) and a store failure (500)
/// answers 401.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error(transparent)]
    Token(#[from] TokenError),

    /// The token is valid but its author no longer exists.
    #[error("account not found")]
    UnknownAccount,

    #[error("role '{actual}' is not permitted here")]
    Forbidden { actual: Role },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Token(TokenError::Missing) => {
                AppError::Unauthorized("Not authorized, no token".to_string())
            }
            AuthError::Token(TokenError::Expired) => {
                AppError::Unauthorized("Not authorized, token expired".to_string())
            }
            AuthError::Token(_) => AppError::Unauthorized("Not authorized, token failed".to_string()),
            AuthError::UnknownAccount => {
                AppError::Unauthorized("Not authorized, account not found".to_string())
            }
            AuthError::Forbidden { .. } => {
                AppError::Forbidden("Forbidden: insufficient permissions".to_string())
            }
            AuthError::Store(e) => AppError::from(e),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        AppError::from(self).into_response()
    }
}

/// authorize
///
/// The single verification primitive behind every guard:
/// 1. No bearer token: `Unauthorized`.
/// 2. Token fails verification (signature, expiry, unknown role): `Unauthorized`.
/// 3. Role not admitted by `required`: `Forbidden`.
/// 4. Author tokens: the live author is re-fetched; a missing author is `Unauthorized`.
pub async fn authorize(
    headers: &HeaderMap,
    tokens: &TokenIssuer,
    repo: &dyn Repository,
    required: RequiredRole,
) -> Result<Principal, AuthError> {
    let claims = tokens
        .verify_bearer(headers.get(header::AUTHORIZATION))
        .inspect_err(|e| tracing::warn!(reason = %e, "rejected bearer token"))?;

    if !required.admits(claims.role) {
        tracing::warn!(
            subject = %claims.sub,
            role = %claims.role,
            ?required,
            "role mismatch"
        );
        return Err(AuthError::Forbidden {
            actual: claims.role,
        });
    }

    match claims.role {
        Role::Admin => Ok(Principal::Admin(AdminClaims {
            id: claims.sub,
            email: claims.email,
        })),
        Role::Author => {
            let record = repo
                .find_author(claims.sub)
                .await?
                .ok_or(AuthError::UnknownAccount)?;
            Ok(Principal::Author(record.into_author()))
        }
    }
}

async fn resolve<S>(parts: &Parts, state: &S, required: RequiredRole) -> Result<Principal, AuthError>
where
    S: Send + Sync,
    TokenState: FromRef<S>,
    RepositoryState: FromRef<S>,
{
    let tokens = TokenState::from_ref(state);
    let repo = RepositoryState::from_ref(state);
    authorize(&parts.headers, &tokens, repo.as_ref(), required).await
}

/// AdminOnly Extractor
///
/// Admits only admin tokens and yields the admin claims.
#[derive(Debug, Clone)]
pub struct AdminOnly(pub AdminClaims);

impl<S> FromRequestParts<S> for AdminOnly
where
    S: Send + Sync,
    TokenState: FromRef<S>,
    RepositoryState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match resolve(parts, state, RequiredRole::Admin).await? {
            Principal::Admin(claims) => Ok(AdminOnly(claims)),
            Principal::Author(_) => Err(AuthError::Forbidden {
                actual: Role::Author,
            }),
        }
    }
}

/// AuthorOnly Extractor
///
/// Admits only author tokens and yields the live author record (no hash).
#[derive(Debug, Clone)]
pub struct AuthorOnly(pub Author);

impl<S> FromRequestParts<S> for AuthorOnly
where
    S: Send + Sync,
    TokenState: FromRef<S>,
    RepositoryState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match resolve(parts, state, RequiredRole::Author).await? {
            Principal::Author(author) => Ok(AuthorOnly(author)),
            Principal::Admin(_) => Err(AuthError::Forbidden { actual: Role::Admin }),
        }
    }
}

/// EitherRole Extractor
///
/// Admits both roles and yields the resolved principal.
#[derive(Debug, Clone)]
pub struct EitherRole(pub Principal);

impl<S> FromRequestParts<S> for EitherRole
where
    S: Send + Sync,
    TokenState: FromRef<S>,
    RepositoryState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        resolve(parts, state, RequiredRole::Either)
            .await
            .map(EitherRole)
    }
}
