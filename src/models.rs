use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// --- Roles & Status ---

/// Role
///
/// The two roles a bearer token can carry. Deserialization of any other string fails,
/// which is how tokens with an unknown role are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Admin,
    Author,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => f.write_str("admin"),
            Role::Author => f.write_str("author"),
        }
    }
}

/// PostStatus
///
/// Publication state of a post. Only `Published` posts are visible on public read paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PostStatus {
    Draft,
    #[default]
    Published,
    Archived,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
            PostStatus::Archived => "archived",
        }
    }
}

impl FromStr for PostStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PostStatus::Draft),
            "published" => Ok(PostStatus::Published),
            "archived" => Ok(PostStatus::Archived),
            other => Err(format!("unknown post status '{other}'")),
        }
    }
}

// --- Authors ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SocialLinks {
    pub facebook: Option<String>,
    pub twitter: Option<String>,
    pub instagram: Option<String>,
    pub youtube: Option<String>,
}

/// Author
///
/// The client-facing author record. It has no password field: the hash only
/// lives on `AuthorRecord`, which is never serialized.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Author {
    pub id: Uuid,
    /// Stored lowercased; unique across all authors.
    pub email: String,
    pub display_name: String,
    pub title: Option<String>,
    pub bio: Option<String>,
    pub profile_image: Option<String>,
    pub social_links: SocialLinks,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// AuthorRecord
///
/// Persisted author row including the bcrypt hash. Internal to the credential store and
/// repository layers.
#[derive(Debug, Clone)]
pub struct AuthorRecord {
    pub author: Author,
    pub password_hash: String,
}

impl AuthorRecord {
    pub fn into_author(self) -> Author {
        self.author
    }
}

/// PublicAuthorProfile
///
/// What anonymous readers see on an author page: no email, no hash.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PublicAuthorProfile {
    pub id: Uuid,
    pub display_name: String,
    pub title: Option<String>,
    pub bio: Option<String>,
    pub profile_image: Option<String>,
    pub social_links: SocialLinks,
}

impl From<Author> for PublicAuthorProfile {
    fn from(author: Author) -> Self {
        Self {
            id: author.id,
            display_name: author.display_name,
            title: author.title,
            bio: author.bio,
            profile_image: author.profile_image,
            social_links: author.social_links,
        }
    }
}

// --- Taxonomy ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq, Eq)]
#[ts(export)]
pub struct Subcategory {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

/// Category
///
/// `post_count` is a display cache maintained by the counter engine, not an authoritative
/// membership count.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub subcategories: Vec<Subcategory>,
    pub post_count: i64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq, Eq)]
#[ts(export)]
pub struct CategorySummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

impl From<Category> for CategorySummary {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
            slug: category.slug,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub post_count: i64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

// --- Posts ---

/// AuthorSnapshot
///
/// Point-in-time copy of the writing author, embedded on the post when it is written.
/// Renaming the author later does not touch existing posts; only `id` is used for
/// ownership decisions.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AuthorSnapshot {
    pub id: Uuid,
    pub display_name: String,
    pub profile_image: Option<String>,
}

impl From<&Author> for AuthorSnapshot {
    fn from(author: &Author) -> Self {
        Self {
            id: author.id,
            display_name: author.display_name.clone(),
            profile_image: author.profile_image.clone(),
        }
    }
}

/// TagSnapshot
///
/// Embedded `{name, slug}` copy of a tag. May name a tag that does not exist in the tag
/// collection; counters are matched by `slug`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq, Eq)]
#[ts(export)]
pub struct TagSnapshot {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BlogPost {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub summary: String,
    pub content: String,
    pub image_url: String,
    /// Estimated reading time in minutes.
    pub read_time: i32,
    #[ts(type = "string")]
    pub publish_date: DateTime<Utc>,
    /// Reference to the owning category.
    pub category: Uuid,
    pub author: AuthorSnapshot,
    pub tags: Vec<TagSnapshot>,
    pub comment_count: i64,
    pub is_featured: bool,
    pub status: PostStatus,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl BlogPost {
    pub fn is_published(&self) -> bool {
        self.status == PostStatus::Published
    }

    pub fn tag_slugs(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(|t| t.slug.as_str())
    }
}

/// PostDetail
///
/// Public detail view: the post, a summary of its category (absent if the category has
/// since been deleted) and its comments in submission order.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PostDetail {
    pub post: BlogPost,
    pub category: Option<CategorySummary>,
    pub comments: Vec<Comment>,
}

/// PostFilter
///
/// Optional narrowing for the public post listing. Never widens visibility: the listing
/// is restricted to published posts regardless of these values.
#[derive(Debug, Clone, Deserialize, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PostFilter {
    /// Category id.
    pub category: Option<Uuid>,
    /// Tag slug.
    pub tag: Option<String>,
    pub featured: Option<bool>,
}

// --- Comments ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_name: String,
    pub author_email: String,
    pub author_number: String,
    pub author_website: Option<String>,
    pub content: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

// --- Request Payloads ---

/// CreateAuthorRequest
///
/// Public signup payload. Required fields default to empty so that a missing field is
/// reported as a validation error rather than a deserialization rejection.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateAuthorRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub display_name: String,
    pub title: Option<String>,
    pub bio: Option<String>,
    pub profile_image: Option<String>,
    pub social_links: Option<SocialLinks>,
}

/// UpdateAuthorRequest
///
/// Partial update. Present fields replace stored values; `password` is re-hashed.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateAuthorRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub social_links: Option<SocialLinks>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginUser {
    pub id: Uuid,
    pub email: String,
    /// Display name; absent for the admin identity.
    pub name: Option<String>,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub token: String,
    pub user: LoginUser,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateCategoryRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub subcategories: Vec<Subcategory>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateCategoryRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcategories: Option<Vec<Subcategory>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateTagRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateTagRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

/// CreatePostRequest
///
/// `author_id` is only consulted when an admin creates a post on an author's behalf;
/// authors always post as themselves.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image_url: String,
    pub read_time: Option<i32>,
    #[ts(type = "string | null")]
    pub publish_date: Option<DateTime<Utc>>,
    pub category: Option<Uuid>,
    #[serde(default)]
    pub tags: Vec<TagSnapshot>,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub status: PostStatus,
    pub author_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdatePostRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_time: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(type = "string | null")]
    pub publish_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<TagSnapshot>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_featured: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PostStatus>,
}

/// SubmitCommentRequest
///
/// Public comment form. Field names follow the website's contact-style form.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SubmitCommentRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mail: String,
    #[serde(default)]
    pub number: String,
    pub website: Option<String>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CommentSubmitted {
    pub success: bool,
    pub message: String,
    pub comment: Comment,
}
