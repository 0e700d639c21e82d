use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

use super::{normalize_tags, required, required_if_present};
use crate::{
    AppState,
    auth::{EitherRole, Principal, can_mutate_post},
    error::AppError,
    models::{
        AuthorSnapshot, BlogPost, CategorySummary, CreatePostRequest, PostDetail, PostFilter,
        UpdatePostRequest,
    },
};

const REQUIRED_POST_FIELDS: &str =
    "Title, slug, summary, content, image URL, read time and category are required.";

fn post_not_found() -> AppError {
    AppError::NotFound("Post not found.".to_string())
}

fn check_read_time(read_time: i32) -> Result<i32, AppError> {
    if read_time < 0 {
        return Err(AppError::Validation(
            "Read time cannot be negative.".to_string(),
        ));
    }
    Ok(read_time)
}

async fn ensure_category_exists(state: &AppState, id: Uuid) -> Result<(), AppError> {
    match state.repo.find_category(id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::NotFound("Category not found.".to_string())),
    }
}

// --- Public reads ---

/// list_posts
///
/// [Public Route] Published posts, newest first, optionally narrowed by category id, tag
/// slug or the featured flag. Drafts and archived posts are never returned here.
#[utoipa::path(
    get,
    path = "/blog/posts",
    params(PostFilter),
    responses((status = 200, description = "Published posts", body = [BlogPost]))
)]
pub async fn list_posts(
    State(state): State<AppState>,
    Query(filter): Query<PostFilter>,
) -> Result<Json<Vec<BlogPost>>, AppError> {
    Ok(Json(state.repo.list_published_posts(&filter).await?))
}

/// get_post_detail
///
/// [Public Route] One published post by slug with its category summary and comments.
/// `commentCount` is reported from the comments actually loaded.
#[utoipa::path(
    get,
    path = "/blog/post/{post}",
    params(("post" = String, Path, description = "Post slug")),
    responses(
        (status = 200, description = "Found", body = PostDetail),
        (status = 404, description = "Not Found or not published")
    )
)]
pub async fn get_post_detail(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PostDetail>, AppError> {
    let mut post = state
        .repo
        .find_published_post_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Blog post not found.".to_string()))?;

    let category = state
        .repo
        .find_category(post.category)
        .await?
        .map(CategorySummary::from);
    let comments = state.repo.list_comments(post.id).await?;
    post.comment_count = comments.len() as i64;

    Ok(Json(PostDetail {
        post,
        category,
        comments,
    }))
}

// --- Editorial ---

/// list_editable_posts
///
/// [Admin or Author Route] Posts in every status. Admins see all of them; authors see
/// only their own.
#[utoipa::path(
    get,
    path = "/admin/blog/posts",
    responses((status = 200, description = "Posts", body = [BlogPost]))
)]
pub async fn list_editable_posts(
    EitherRole(actor): EitherRole,
    State(state): State<AppState>,
) -> Result<Json<Vec<BlogPost>>, AppError> {
    let owner = match &actor {
        Principal::Admin(_) => None,
        Principal::Author(author) => Some(author.id),
    };
    Ok(Json(state.repo.list_posts(owner).await?))
}

/// create_post
///
/// [Admin or Author Route] Authors always write as themselves. Admins must name the author
/// via `authorId`. The author snapshot is taken from the live author record now and is
/// not refreshed later. Category and tag counters are bumped by the counter engine.
#[utoipa::path(
    post,
    path = "/admin/blog/posts",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Created", body = BlogPost),
        (status = 400, description = "Missing field, missing authorId or duplicate title/slug"),
        (status = 404, description = "Author or category not found")
    )
)]
pub async fn create_post(
    EitherRole(actor): EitherRole,
    State(state): State<AppState>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<BlogPost>), AppError> {
    let author = match actor {
        Principal::Author(author) => author,
        Principal::Admin(_) => {
            let author_id = payload.author_id.ok_or_else(|| {
                AppError::Validation("Admin must provide an 'authorId' to create a post.".to_string())
            })?;
            state
                .repo
                .find_author(author_id)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound("The specified author was not found.".to_string())
                })?
                .into_author()
        }
    };

    let category = payload
        .category
        .ok_or_else(|| AppError::Validation(REQUIRED_POST_FIELDS.to_string()))?;
    let read_time = payload
        .read_time
        .ok_or_else(|| AppError::Validation(REQUIRED_POST_FIELDS.to_string()))?;

    let now = Utc::now();
    let post = BlogPost {
        id: Uuid::new_v4(),
        title: required(&payload.title, REQUIRED_POST_FIELDS)?,
        slug: required(&payload.slug, REQUIRED_POST_FIELDS)?,
        summary: required(&payload.summary, REQUIRED_POST_FIELDS)?,
        content: required(&payload.content, REQUIRED_POST_FIELDS)?,
        image_url: required(&payload.image_url, REQUIRED_POST_FIELDS)?,
        read_time: check_read_time(read_time)?,
        publish_date: payload.publish_date.unwrap_or(now),
        category,
        author: AuthorSnapshot::from(&author),
        tags: normalize_tags(payload.tags),
        comment_count: 0,
        is_featured: payload.is_featured,
        status: payload.status,
        created_at: now,
        updated_at: now,
    };

    ensure_category_exists(&state, category).await?;

    state.counters.create_post(&post).await?;
    tracing::info!(post_id = %post.id, author_id = %author.id, "post created");

    Ok((StatusCode::CREATED, Json(post)))
}

/// update_post
///
/// [Admin or Owning Author Route] Partial update. Ownership is checked against the stored
/// post's author snapshot; the author itself cannot be reassigned. Category and tag
/// changes go through the counter engine.
#[utoipa::path(
    put,
    path = "/admin/blog/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Updated", body = BlogPost),
        (status = 400, description = "Invalid field or duplicate title/slug"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Post or category not found")
    )
)]
pub async fn update_post(
    EitherRole(actor): EitherRole,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<Json<BlogPost>, AppError> {
    let before = state.repo.find_post(id).await?.ok_or_else(post_not_found)?;

    if !can_mutate_post(&actor, &before) {
        tracing::warn!(post_id = %id, actor = %actor.id(), "update refused: not the owner");
        return Err(AppError::Forbidden(
            "Not authorized to update this post.".to_string(),
        ));
    }

    let mut after = before.clone();
    if let Some(title) = required_if_present(payload.title, "Title cannot be empty.")? {
        after.title = title;
    }
    if let Some(slug) = required_if_present(payload.slug, "Slug cannot be empty.")? {
        after.slug = slug;
    }
    if let Some(summary) = required_if_present(payload.summary, "Summary cannot be empty.")? {
        after.summary = summary;
    }
    if let Some(content) = required_if_present(payload.content, "Content cannot be empty.")? {
        after.content = content;
    }
    if let Some(image_url) = required_if_present(payload.image_url, "Image URL cannot be empty.")? {
        after.image_url = image_url;
    }
    if let Some(read_time) = payload.read_time {
        after.read_time = check_read_time(read_time)?;
    }
    if let Some(publish_date) = payload.publish_date {
        after.publish_date = publish_date;
    }
    if let Some(category) = payload.category {
        if category != before.category {
            ensure_category_exists(&state, category).await?;
        }
        after.category = category;
    }
    if let Some(tags) = payload.tags {
        after.tags = normalize_tags(tags);
    }
    if let Some(is_featured) = payload.is_featured {
        after.is_featured = is_featured;
    }
    if let Some(status) = payload.status {
        after.status = status;
    }
    after.updated_at = Utc::now();

    if !state.counters.update_post(&before, &after).await? {
        return Err(post_not_found());
    }
    tracing::info!(post_id = %id, actor = %actor.id(), "post updated");

    Ok(Json(after))
}

/// delete_post
///
/// [Admin or Owning Author Route] Deletes the post and its comments and releases its
/// category and tag counts.
#[utoipa::path(
    delete,
    path = "/admin/blog/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_post(
    EitherRole(actor): EitherRole,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let post = state.repo.find_post(id).await?.ok_or_else(post_not_found)?;

    if !can_mutate_post(&actor, &post) {
        tracing::warn!(post_id = %id, actor = %actor.id(), "delete refused: not the owner");
        return Err(AppError::Forbidden(
            "Not authorized to delete this post.".to_string(),
        ));
    }

    if !state.counters.delete_post(&post).await? {
        return Err(post_not_found());
    }
    tracing::info!(post_id = %id, actor = %actor.id(), "post deleted");

    Ok(StatusCode::NO_CONTENT)
}
