use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    auth::{AdminOnly, AuthorOnly},
    error::AppError,
    models::{Author, CreateAuthorRequest, PublicAuthorProfile, UpdateAuthorRequest},
};

/// create_author
///
/// [Public Route] Author signup. The email is stored lowercased and must be unique in any
/// case; the password is stored only as a bcrypt hash and never returned.
#[utoipa::path(
    post,
    path = "/admin/authors",
    request_body = CreateAuthorRequest,
    responses(
        (status = 201, description = "Author created", body = Author),
        (status = 400, description = "Missing fields or duplicate email")
    )
)]
pub async fn create_author(
    State(state): State<AppState>,
    Json(payload): Json<CreateAuthorRequest>,
) -> Result<(StatusCode, Json<Author>), AppError> {
    let author = state.credentials.create_author(payload).await?;
    Ok((StatusCode::CREATED, Json(author)))
}

/// list_authors
///
/// [Admin Route] Every author, ordered by display name.
#[utoipa::path(
    get,
    path = "/admin/authors",
    responses((status = 200, description = "Authors", body = [Author]))
)]
pub async fn list_authors(
    _admin: AdminOnly,
    State(state): State<AppState>,
) -> Result<Json<Vec<Author>>, AppError> {
    Ok(Json(state.repo.list_authors().await?))
}

/// update_author
///
/// [Admin Route] Partial update of any author account.
#[utoipa::path(
    put,
    path = "/admin/authors/{id}",
    params(("id" = Uuid, Path, description = "Author ID")),
    request_body = UpdateAuthorRequest,
    responses(
        (status = 200, description = "Updated", body = Author),
        (status = 400, description = "Email in use or invalid field"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_author(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAuthorRequest>,
) -> Result<Json<Author>, AppError> {
    let author = state.credentials.update_author(id, payload).await?;
    tracing::info!(admin = %admin.email, author_id = %id, "author updated by admin");
    Ok(Json(author))
}

/// delete_author
///
/// [Admin Route] Removes an author account. Posts they wrote keep their author snapshot.
#[utoipa::path(
    delete,
    path = "/admin/authors/{id}",
    params(("id" = Uuid, Path, description = "Author ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_author(
    _admin: AdminOnly,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.repo.delete_author(id).await? {
        tracing::info!(author_id = %id, "author deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Author not found.".to_string()))
    }
}

/// get_author_profile
///
/// [Public Route] The public face of an author: no email, no hash.
#[utoipa::path(
    get,
    path = "/blog/author/{id}",
    params(("id" = Uuid, Path, description = "Author ID")),
    responses(
        (status = 200, description = "Found", body = PublicAuthorProfile),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_author_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PublicAuthorProfile>, AppError> {
    let record = state
        .repo
        .find_author(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Author not found.".to_string()))?;
    Ok(Json(record.into_author().into()))
}

/// get_my_profile
///
/// [Author Route] The requesting author's own live record.
#[utoipa::path(
    get,
    path = "/admin/profile",
    responses((status = 200, description = "My profile", body = Author))
)]
pub async fn get_my_profile(AuthorOnly(author): AuthorOnly) -> Json<Author> {
    Json(author)
}

/// update_my_profile
///
/// [Author Route] Self-service partial update, under the same rules as the admin path.
#[utoipa::path(
    put,
    path = "/admin/profile",
    request_body = UpdateAuthorRequest,
    responses(
        (status = 200, description = "Updated", body = Author),
        (status = 400, description = "Email in use or invalid field")
    )
)]
pub async fn update_my_profile(
    AuthorOnly(author): AuthorOnly,
    State(state): State<AppState>,
    Json(payload): Json<UpdateAuthorRequest>,
) -> Result<Json<Author>, AppError> {
    Ok(Json(state.credentials.update_author(author.id, payload).await?))
}
