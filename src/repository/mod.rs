use crate::models::{
    Author, AuthorRecord, BlogPost, Category, Comment, PostFilter, Tag,
};
use async_trait::async_trait;
use std::{fmt, sync::Arc};
use thiserror::Error;
use uuid::Uuid;

mod memory;
mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;

/// UniqueField
///
/// The uniquely-indexed fields across the content collections. Used to report which
/// constraint a rejected write collided with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Email,
    Name,
    Slug,
    Title,
}

impl UniqueField {
    /// Maps a unique-constraint name (`<table>_<column>_key`) to the field it guards.
    pub fn from_constraint(constraint: &str) -> Option<Self> {
        let column = constraint.strip_suffix("_key")?.rsplit('_').next()?;
        match column {
            "email" => Some(UniqueField::Email),
            "name" => Some(UniqueField::Name),
            "slug" => Some(UniqueField::Slug),
            "title" => Some(UniqueField::Title),
            _ => None,
        }
    }
}

impl fmt::Display for UniqueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UniqueField::Email => "email",
            UniqueField::Name => "name",
            UniqueField::Slug => "slug",
            UniqueField::Title => "title",
        };
        f.write_str(name)
    }
}

/// StoreError
///
/// Failures surfaced by a `Repository`. Unique-index violations are distinguished so the
/// HTTP layer can answer 400 instead of 500.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("duplicate {0}")]
    Duplicate(UniqueField),

    #[error("{0}")]
    Backend(String),
}

/// Repository Trait
///
/// Persistence contract for the blog collections. Every method is a single-document (or
/// single-statement) operation; multi-step sequences such as "insert post, then bump
/// counters" are composed by the counter engine and are not transactional.
///
/// Counter adjustments clamp at zero.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Authors ---
    async fn insert_author(&self, record: &AuthorRecord) -> Result<(), StoreError>;
    async fn find_author(&self, id: Uuid) -> Result<Option<AuthorRecord>, StoreError>;
    /// `email` must already be normalized (trimmed, lowercased).
    async fn find_author_by_email(&self, email: &str) -> Result<Option<AuthorRecord>, StoreError>;
    /// All authors ordered by display name.
    async fn list_authors(&self) -> Result<Vec<Author>, StoreError>;
    /// Full replacement of the stored record. Returns false if no such author.
    async fn update_author(&self, record: &AuthorRecord) -> Result<bool, StoreError>;
    async fn delete_author(&self, id: Uuid) -> Result<bool, StoreError>;

    // --- Categories ---
    async fn insert_category(&self, category: &Category) -> Result<(), StoreError>;
    async fn find_category(&self, id: Uuid) -> Result<Option<Category>, StoreError>;
    /// All categories ordered by name.
    async fn list_categories(&self) -> Result<Vec<Category>, StoreError>;
    /// Replaces name, slug and subcategories. `post_count` is left untouched.
    async fn update_category(&self, category: &Category) -> Result<bool, StoreError>;
    async fn delete_category(&self, id: Uuid) -> Result<bool, StoreError>;
    async fn adjust_category_post_count(&self, id: Uuid, delta: i64) -> Result<bool, StoreError>;

    // --- Tags ---
    async fn insert_tag(&self, tag: &Tag) -> Result<(), StoreError>;
    async fn find_tag(&self, id: Uuid) -> Result<Option<Tag>, StoreError>;
    /// All tags ordered by name.
    async fn list_tags(&self) -> Result<Vec<Tag>, StoreError>;
    /// Tags ordered by `post_count` descending, at most `limit`.
    async fn list_popular_tags(&self, limit: i64) -> Result<Vec<Tag>, StoreError>;
    /// Replaces name and slug. `post_count` is left untouched.
    async fn update_tag(&self, tag: &Tag) -> Result<bool, StoreError>;
    async fn delete_tag(&self, id: Uuid) -> Result<bool, StoreError>;
    /// Matched by slug. Returns false (and changes nothing) when no tag has that slug.
    async fn adjust_tag_post_count(&self, slug: &str, delta: i64) -> Result<bool, StoreError>;

    // --- Posts ---
    async fn insert_post(&self, post: &BlogPost) -> Result<(), StoreError>;
    async fn find_post(&self, id: Uuid) -> Result<Option<BlogPost>, StoreError>;
    /// Only returns the post if its status is published.
    async fn find_published_post_by_slug(&self, slug: &str) -> Result<Option<BlogPost>, StoreError>;
    /// Published posts only, newest `publish_date` first.
    async fn list_published_posts(&self, filter: &PostFilter) -> Result<Vec<BlogPost>, StoreError>;
    /// Every post in any status, optionally restricted to one author, newest first.
    async fn list_posts(&self, author_id: Option<Uuid>) -> Result<Vec<BlogPost>, StoreError>;
    /// Replaces the editable fields. `comment_count` is left untouched.
    async fn update_post(&self, post: &BlogPost) -> Result<bool, StoreError>;
    async fn delete_post(&self, id: Uuid) -> Result<bool, StoreError>;
    async fn increment_comment_count(&self, post_id: Uuid) -> Result<bool, StoreError>;

    // --- Comments ---
    async fn insert_comment(&self, comment: &Comment) -> Result<(), StoreError>;
    /// Comments of one post, oldest first.
    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<Comment>, StoreError>;
    /// Returns the number of comments removed.
    async fn delete_comments_for_post(&self, post_id: Uuid) -> Result<u64, StoreError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;
