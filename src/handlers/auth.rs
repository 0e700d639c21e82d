use axum::{Json, extract::State};

use crate::{
    AppState,
    auth::{AdminClaims, Principal},
    credentials::{CredentialError, normalize_email},
    error::AppError,
    models::{LoginRequest, LoginResponse, LoginUser},
};

const BAD_LOGIN: &str = "Invalid email or password.";

/// login
///
/// [Public Route] Unified login for both roles. The configured admin credential is checked
/// first; any other email is looked up among authors.
///
/// * Unknown email: 404.
/// * Known email, wrong password: 401.
/// * Success: a one-day bearer token plus the public identity it carries.
#[utoipa::path(
    post,
    path = "/admin/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Missing email or password"),
        (status = 401, description = "Wrong password"),
        (status = 404, description = "No account with this email")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let email = normalize_email(&payload.email);
    if email.is_empty() || payload.password.is_empty() {
        return Err(AppError::Validation(
            "Please provide both email and password.".to_string(),
        ));
    }

    let principal = if email == state.config.admin.email {
        let admin = &state.config.admin;
        if !state.credentials.verify_admin(admin, &payload.password).await? {
            tracing::warn!("admin login rejected: wrong password");
            return Err(AppError::Unauthorized(BAD_LOGIN.to_string()));
        }
        Principal::Admin(AdminClaims::from(admin))
    } else {
        let record = state
            .repo
            .find_author_by_email(&email)
            .await?
            .ok_or_else(|| AppError::NotFound("No account found with this email.".to_string()))?;

        let author = state
            .credentials
            .verify_password(record, &payload.password)
            .await
            .map_err(|e| match e {
                CredentialError::InvalidCredentials => {
                    tracing::warn!("author login rejected: wrong password");
                    AppError::Unauthorized(BAD_LOGIN.to_string())
                }
                other => AppError::from(other),
            })?;
        Principal::Author(author)
    };

    let token = state
        .tokens
        .issue(&principal)
        .map_err(|_| AppError::Internal("Could not issue token.".to_string()))?;

    tracing::info!(subject = %principal.id(), role = %principal.role(), "login succeeded");

    Ok(Json(LoginResponse {
        token,
        user: LoginUser {
            id: principal.id(),
            email: principal.email().to_string(),
            name: principal.display_name().map(str::to_owned),
            role: principal.role(),
        },
    }))
}
