use axum::{http::StatusCode, response::IntoResponse};
use blog_cms::{
    AppError,
    handlers::{normalize_tags, required},
    models::{
        CreatePostRequest, PostStatus, Role, SubmitCommentRequest, TagSnapshot,
        UpdateAuthorRequest,
    },
    repository::{StoreError, UniqueField},
};
use serde_json::json;
use std::str::FromStr;

// --- Enums ---

#[test]
fn test_role_round_trips_lowercase_and_rejects_unknown() {
    assert_eq!(serde_json::to_value(Role::Admin).unwrap(), json!("admin"));
    assert_eq!(
        serde_json::from_value::<Role>(json!("author")).unwrap(),
        Role::Author
    );
    assert!(serde_json::from_value::<Role>(json!("editor")).is_err());
    assert!(serde_json::from_value::<Role>(json!("Admin")).is_err());
}

#[test]
fn test_post_status_defaults_to_published() {
    assert_eq!(PostStatus::default(), PostStatus::Published);
    assert_eq!(PostStatus::from_str("draft"), Ok(PostStatus::Draft));
    assert_eq!(PostStatus::Archived.as_str(), "archived");
    assert!(PostStatus::from_str("deleted").is_err());
}

// --- Request payloads ---

#[test]
fn test_create_post_request_accepts_minimal_camel_case_body() {
    let req: CreatePostRequest = serde_json::from_value(json!({
        "title": "T",
        "slug": "t",
        "imageUrl": "https://img/x.jpg",
        "readTime": 3,
        "isFeatured": true,
        "authorId": "7d0c4a4e-2a36-4f57-9a57-6f0b1c6c9a11"
    }))
    .unwrap();

    assert_eq!(req.image_url, "https://img/x.jpg");
    assert_eq!(req.read_time, Some(3));
    assert!(req.is_featured);
    assert!(req.author_id.is_some());
    // Omitted fields fall back to defaults so validation can report them.
    assert_eq!(req.summary, "");
    assert!(req.tags.is_empty());
    assert_eq!(req.status, PostStatus::Published);
    assert!(req.category.is_none());
}

#[test]
fn test_comment_form_missing_fields_default_to_empty() {
    let req: SubmitCommentRequest =
        serde_json::from_value(json!({ "name": "Reader", "message": "Hi" })).unwrap();

    assert_eq!(req.mail, "");
    assert_eq!(req.number, "");
    assert!(req.website.is_none());
}

#[test]
fn test_partial_author_update_only_carries_present_fields() {
    let req: UpdateAuthorRequest =
        serde_json::from_value(json!({ "displayName": "New" })).unwrap();

    assert_eq!(req.display_name.as_deref(), Some("New"));
    assert!(req.password.is_none());
    assert_eq!(serde_json::to_value(&req).unwrap(), json!({ "displayName": "New" }));
}

// --- Validation helpers ---

fn tag(name: &str, slug: &str) -> TagSnapshot {
    TagSnapshot {
        name: name.to_string(),
        slug: slug.to_string(),
    }
}

#[test]
fn test_normalize_tags_dedupes_by_slug_and_drops_blank_slugs() {
    let tags = normalize_tags(vec![
        tag("Travel", " travel "),
        tag("Travel again", "travel"),
        tag("Nameless", "  "),
        tag("", "food"),
    ]);

    assert_eq!(tags, vec![tag("Travel", "travel"), tag("food", "food")]);
}

#[test]
fn test_required_trims_and_rejects_blank() {
    assert_eq!(required("  hi ", "x").unwrap(), "hi");
    assert!(matches!(required("   ", "x"), Err(AppError::Validation(_))));
}

// --- Error mapping ---

#[test]
fn test_unique_constraint_names_map_to_fields() {
    assert_eq!(
        UniqueField::from_constraint("authors_email_key"),
        Some(UniqueField::Email)
    );
    assert_eq!(
        UniqueField::from_constraint("posts_title_key"),
        Some(UniqueField::Title)
    );
    assert_eq!(
        UniqueField::from_constraint("categories_slug_key"),
        Some(UniqueField::Slug)
    );
    assert_eq!(UniqueField::from_constraint("posts_pkey"), None);
}

#[test]
fn test_app_error_statuses() {
    let cases = [
        (AppError::Validation("v".into()), StatusCode::BAD_REQUEST),
        (AppError::Duplicate("d".into()), StatusCode::BAD_REQUEST),
        (AppError::NotFound("n".into()), StatusCode::NOT_FOUND),
        (AppError::Unauthorized("u".into()), StatusCode::UNAUTHORIZED),
        (AppError::Forbidden("f".into()), StatusCode::FORBIDDEN),
        (AppError::Internal("i".into()), StatusCode::INTERNAL_SERVER_ERROR),
    ];

    for (err, status) in cases {
        assert_eq!(err.into_response().status(), status);
    }
}

#[test]
fn test_store_errors_translate_without_leaking_detail_type() {
    let duplicate = AppError::from(StoreError::Duplicate(UniqueField::Slug));
    assert!(matches!(&duplicate, AppError::Duplicate(msg) if msg.contains("slug")));
    assert_eq!(duplicate.status(), StatusCode::BAD_REQUEST);

    let backend = AppError::from(StoreError::Backend("pool timed out".to_string()));
    assert_eq!(backend.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
