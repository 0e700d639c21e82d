use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

use super::required;
use crate::{
    AppState,
    error::AppError,
    models::{Comment, CommentSubmitted, SubmitCommentRequest},
};

const NAME_MIN_CHARS: usize = 2;
const NAME_MAX_CHARS: usize = 80;
const MESSAGE_MAX_CHARS: usize = 1000;

const REQUIRED_COMMENT_FIELDS: &str = "Name, email, number, and message are required fields.";

/// submit_comment
///
/// [Public Route] Stores a reader comment on a published post and bumps the post's
/// comment count. Values are trimmed; the email is lowercased; a blank website is
/// stored as absent.
#[utoipa::path(
    post,
    path = "/blog/post/{post}/comments",
    params(("post" = Uuid, Path, description = "Post ID")),
    request_body = SubmitCommentRequest,
    responses(
        (status = 201, description = "Comment stored", body = CommentSubmitted),
        (status = 400, description = "Missing or invalid field"),
        (status = 404, description = "Post not found or not published")
    )
)]
pub async fn submit_comment(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<SubmitCommentRequest>,
) -> Result<(StatusCode, Json<CommentSubmitted>), AppError> {
    let author_name = required(&payload.name, REQUIRED_COMMENT_FIELDS)?;
    let author_email = required(&payload.mail, REQUIRED_COMMENT_FIELDS)?.to_lowercase();
    let author_number = required(&payload.number, REQUIRED_COMMENT_FIELDS)?;
    let content = required(&payload.message, REQUIRED_COMMENT_FIELDS)?;

    let name_len = author_name.chars().count();
    if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&name_len) {
        return Err(AppError::Validation(format!(
            "Name must be between {NAME_MIN_CHARS} and {NAME_MAX_CHARS} characters."
        )));
    }
    if content.chars().count() > MESSAGE_MAX_CHARS {
        return Err(AppError::Validation(format!(
            "Message cannot exceed {MESSAGE_MAX_CHARS} characters."
        )));
    }

    let post = state.repo.find_post(post_id).await?;
    if !post.is_some_and(|p| p.is_published()) {
        return Err(AppError::NotFound("Blog post not found.".to_string()));
    }

    let comment = Comment {
        id: Uuid::new_v4(),
        post_id,
        author_name,
        author_email,
        author_number,
        author_website: payload
            .website
            .map(|w| w.trim().to_string())
            .filter(|w| !w.is_empty()),
        content,
        created_at: Utc::now(),
    };

    state.counters.add_comment(&comment).await?;
    tracing::info!(comment_id = %comment.id, %post_id, "comment submitted");

    Ok((
        StatusCode::CREATED,
        Json(CommentSubmitted {
            success: true,
            message: "Comment submitted successfully.".to_string(),
            comment,
        }),
    ))
}
