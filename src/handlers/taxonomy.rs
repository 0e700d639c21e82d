use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

use super::{required, required_if_present};
use crate::{
    AppState,
    auth::{AdminOnly, EitherRole},
    error::AppError,
    models::{
        Category, CreateCategoryRequest, CreateTagRequest, Subcategory, Tag,
        UpdateCategoryRequest, UpdateTagRequest,
    },
};

/// Size of the public "popular tags" widget.
const POPULAR_TAG_LIMIT: i64 = 20;

fn category_not_found() -> AppError {
    AppError::NotFound("Category not found.".to_string())
}

fn tag_not_found() -> AppError {
    AppError::NotFound("Tag not found.".to_string())
}

fn clean_subcategories(subcategories: Vec<Subcategory>) -> Result<Vec<Subcategory>, AppError> {
    subcategories
        .into_iter()
        .map(|sub| {
            Ok(Subcategory {
                name: required(&sub.name, "Subcategory name and slug are required.")?,
                slug: required(&sub.slug, "Subcategory name and slug are required.")?,
            })
        })
        .collect()
}

// --- Categories ---

/// list_public_categories
///
/// [Public Route] All categories with their cached post counts, ordered by name.
#[utoipa::path(
    get,
    path = "/blog/categories",
    responses((status = 200, description = "Categories", body = [Category]))
)]
pub async fn list_public_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, AppError> {
    Ok(Json(state.repo.list_categories().await?))
}

/// list_subcategories
///
/// [Public Route] The ordered subcategory list of one category.
#[utoipa::path(
    get,
    path = "/blog/categories/{id}/subcategories",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Subcategories", body = [Subcategory]),
        (status = 404, description = "Not Found")
    )
)]
pub async fn list_subcategories(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Subcategory>>, AppError> {
    let category = state
        .repo
        .find_category(id)
        .await?
        .ok_or_else(category_not_found)?;
    Ok(Json(category.subcategories))
}

/// list_categories
///
/// [Admin or Author Route] Category picker for the post editor.
#[utoipa::path(
    get,
    path = "/admin/categories",
    responses((status = 200, description = "Categories", body = [Category]))
)]
pub async fn list_categories(
    _actor: EitherRole,
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, AppError> {
    Ok(Json(state.repo.list_categories().await?))
}

/// create_category
///
/// [Admin Route] Name and slug are required and globally unique. The count starts at zero.
#[utoipa::path(
    post,
    path = "/admin/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Created", body = Category),
        (status = 400, description = "Missing field or duplicate name/slug")
    )
)]
pub async fn create_category(
    _admin: AdminOnly,
    State(state): State<AppState>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    let now = Utc::now();
    let category = Category {
        id: Uuid::new_v4(),
        name: required(&payload.name, "Name and slug are required.")?,
        slug: required(&payload.slug, "Name and slug are required.")?,
        subcategories: clean_subcategories(payload.subcategories)?,
        post_count: 0,
        created_at: now,
        updated_at: now,
    };

    state.repo.insert_category(&category).await?;
    tracing::info!(category_id = %category.id, slug = %category.slug, "category created");

    Ok((StatusCode::CREATED, Json(category)))
}

/// update_category
///
/// [Admin Route] Partial update of name, slug and subcategories. The post count is owned
/// by the counter engine and cannot be set here.
#[utoipa::path(
    put,
    path = "/admin/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Updated", body = Category),
        (status = 400, description = "Invalid field or duplicate name/slug"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_category(
    _admin: AdminOnly,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> Result<Json<Category>, AppError> {
    let mut category = state
        .repo
        .find_category(id)
        .await?
        .ok_or_else(category_not_found)?;

    if let Some(name) = required_if_present(payload.name, "Name cannot be empty.")? {
        category.name = name;
    }
    if let Some(slug) = required_if_present(payload.slug, "Slug cannot be empty.")? {
        category.slug = slug;
    }
    if let Some(subcategories) = payload.subcategories {
        category.subcategories = clean_subcategories(subcategories)?;
    }
    category.updated_at = Utc::now();

    if !state.repo.update_category(&category).await? {
        return Err(category_not_found());
    }
    Ok(Json(category))
}

/// delete_category
///
/// [Admin Route] Posts referencing the category keep their reference; the public detail
/// view then reports no category.
#[utoipa::path(
    delete,
    path = "/admin/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_category(
    _admin: AdminOnly,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.repo.delete_category(id).await? {
        tracing::info!(category_id = %id, "category deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(category_not_found())
    }
}

// --- Tags ---

/// list_popular_tags
///
/// [Public Route] The most-used tags, highest post count first.
#[utoipa::path(
    get,
    path = "/blog/tags",
    responses((status = 200, description = "Popular tags", body = [Tag]))
)]
pub async fn list_popular_tags(State(state): State<AppState>) -> Result<Json<Vec<Tag>>, AppError> {
    Ok(Json(state.repo.list_popular_tags(POPULAR_TAG_LIMIT).await?))
}

/// list_tags
///
/// [Admin or Author Route] Every tag, ordered by name.
#[utoipa::path(
    get,
    path = "/admin/tags",
    responses((status = 200, description = "Tags", body = [Tag]))
)]
pub async fn list_tags(
    _actor: EitherRole,
    State(state): State<AppState>,
) -> Result<Json<Vec<Tag>>, AppError> {
    Ok(Json(state.repo.list_tags().await?))
}

#[utoipa::path(
    post,
    path = "/admin/tags",
    request_body = CreateTagRequest,
    responses(
        (status = 201, description = "Created", body = Tag),
        (status = 400, description = "Missing field or duplicate name/slug")
    )
)]
pub async fn create_tag(
    _admin: AdminOnly,
    State(state): State<AppState>,
    Json(payload): Json<CreateTagRequest>,
) -> Result<(StatusCode, Json<Tag>), AppError> {
    let now = Utc::now();
    let tag = Tag {
        id: Uuid::new_v4(),
        name: required(&payload.name, "Name and slug are required.")?,
        slug: required(&payload.slug, "Name and slug are required.")?,
        post_count: 0,
        created_at: now,
        updated_at: now,
    };

    state.repo.insert_tag(&tag).await?;
    tracing::info!(tag_id = %tag.id, slug = %tag.slug, "tag created");

    Ok((StatusCode::CREATED, Json(tag)))
}

/// update_tag
///
/// [Admin Route] Renaming a tag does not rewrite the snapshots already embedded in posts.
/// Changing its slug detaches it from those snapshots for counting purposes.
#[utoipa::path(
    put,
    path = "/admin/tags/{id}",
    params(("id" = Uuid, Path, description = "Tag ID")),
    request_body = UpdateTagRequest,
    responses(
        (status = 200, description = "Updated", body = Tag),
        (status = 400, description = "Invalid field or duplicate name/slug"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_tag(
    _admin: AdminOnly,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTagRequest>,
) -> Result<Json<Tag>, AppError> {
    let mut tag = state.repo.find_tag(id).await?.ok_or_else(tag_not_found)?;

    if let Some(name) = required_if_present(payload.name, "Name cannot be empty.")? {
        tag.name = name;
    }
    if let Some(slug) = required_if_present(payload.slug, "Slug cannot be empty.")? {
        tag.slug = slug;
    }
    tag.updated_at = Utc::now();

    if !state.repo.update_tag(&tag).await? {
        return Err(tag_not_found());
    }
    Ok(Json(tag))
}

#[utoipa::path(
    delete,
    path = "/admin/tags/{id}",
    params(("id" = Uuid, Path, description = "Tag ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_tag(
    _admin: AdminOnly,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.repo.delete_tag(id).await? {
        tracing::info!(tag_id = %id, "tag deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(tag_not_found())
    }
}
