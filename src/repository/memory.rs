use super::{Repository, StoreError, UniqueField};
use crate::models::{Author, AuthorRecord, BlogPost, Category, Comment, PostFilter, Tag};
use async_trait::async_trait;
use std::{
    cmp::Reverse,
    sync::{Mutex, MutexGuard},
};
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    authors: Vec<AuthorRecord>,
    categories: Vec<Category>,
    tags: Vec<Tag>,
    posts: Vec<BlogPost>,
    comments: Vec<Comment>,
}

/// MemoryRepository
///
/// In-process `Repository` with the same observable semantics as the Postgres store:
/// unique fields are enforced, public reads only see published posts and counters clamp
/// at zero. Each method takes the lock once, so every call is an atomic single-document
/// operation, mirroring what the document store guarantees.
#[derive(Default)]
pub struct MemoryRepository {
    tables: Mutex<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }
}

/// Reports the first of two unique fields already held by another entry. `others` must
/// exclude the candidate itself.
fn unique_pair_conflict<'a>(
    others: impl IntoIterator<Item = (&'a str, &'a str)>,
    first: (UniqueField, &str),
    second: (UniqueField, &str),
) -> Option<UniqueField> {
    let mut clash = None;
    for (a, b) in others {
        if a == first.1 {
            return Some(first.0);
        }
        if b == second.1 {
            clash = Some(second.0);
        }
    }
    clash
}

fn email_conflict(authors: &[AuthorRecord], candidate: &AuthorRecord) -> Option<UniqueField> {
    authors
        .iter()
        .any(|a| a.author.id != candidate.author.id && a.author.email == candidate.author.email)
        .then_some(UniqueField::Email)
}

fn category_conflict(categories: &[Category], candidate: &Category) -> Option<UniqueField> {
    unique_pair_conflict(
        categories
            .iter()
            .filter(|c| c.id != candidate.id)
            .map(|c| (c.name.as_str(), c.slug.as_str())),
        (UniqueField::Name, candidate.name.as_str()),
        (UniqueField::Slug, candidate.slug.as_str()),
    )
}

fn tag_conflict(tags: &[Tag], candidate: &Tag) -> Option<UniqueField> {
    unique_pair_conflict(
        tags.iter()
            .filter(|t| t.id != candidate.id)
            .map(|t| (t.name.as_str(), t.slug.as_str())),
        (UniqueField::Name, candidate.name.as_str()),
        (UniqueField::Slug, candidate.slug.as_str()),
    )
}

fn post_conflict(posts: &[BlogPost], candidate: &BlogPost) -> Option<UniqueField> {
    unique_pair_conflict(
        posts
            .iter()
            .filter(|p| p.id != candidate.id)
            .map(|p| (p.title.as_str(), p.slug.as_str())),
        (UniqueField::Title, candidate.title.as_str()),
        (UniqueField::Slug, candidate.slug.as_str()),
    )
}

fn clamp_add(value: i64, delta: i64) -> i64 {
    value.saturating_add(delta).max(0)
}

#[async_trait]
impl Repository for MemoryRepository {
    // --- Authors ---

    async fn insert_author(&self, record: &AuthorRecord) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        if let Some(field) = email_conflict(&tables.authors, record) {
            return Err(StoreError::Duplicate(field));
        }
        tables.authors.push(record.clone());
        Ok(())
    }

    async fn find_author(&self, id: Uuid) -> Result<Option<AuthorRecord>, StoreError> {
        let tables = self.tables()?;
        Ok(tables.authors.iter().find(|a| a.author.id == id).cloned())
    }

    async fn find_author_by_email(&self, email: &str) -> Result<Option<AuthorRecord>, StoreError> {
        let tables = self.tables()?;
        Ok(tables.authors.iter().find(|a| a.author.email == email).cloned())
    }

    async fn list_authors(&self) -> Result<Vec<Author>, StoreError> {
        let tables = self.tables()?;
        let mut authors: Vec<Author> = tables.authors.iter().map(|a| a.author.clone()).collect();
        authors.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        Ok(authors)
    }

    async fn update_author(&self, record: &AuthorRecord) -> Result<bool, StoreError> {
        let mut tables = self.tables()?;
        // A missing row is reported as such even when its new email would collide.
        if !tables.authors.iter().any(|a| a.author.id == record.author.id) {
            return Ok(false);
        }
        if let Some(field) = email_conflict(&tables.authors, record) {
            return Err(StoreError::Duplicate(field));
        }
        match tables.authors.iter_mut().find(|a| a.author.id == record.author.id) {
            Some(slot) => {
                *slot = record.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_author(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables()?;
        let before = tables.authors.len();
        tables.authors.retain(|a| a.author.id != id);
        Ok(tables.authors.len() < before)
    }

    // --- Categories ---

    async fn insert_category(&self, category: &Category) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        if let Some(field) = category_conflict(&tables.categories, category) {
            return Err(StoreError::Duplicate(field));
        }
        tables.categories.push(category.clone());
        Ok(())
    }

    async fn find_category(&self, id: Uuid) -> Result<Option<Category>, StoreError> {
        let tables = self.tables()?;
        Ok(tables.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let tables = self.tables()?;
        let mut categories = tables.categories.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn update_category(&self, category: &Category) -> Result<bool, StoreError> {
        let mut tables = self.tables()?;
        if !tables.categories.iter().any(|c| c.id == category.id) {
            return Ok(false);
        }
        if let Some(field) = category_conflict(&tables.categories, category) {
            return Err(StoreError::Duplicate(field));
        }
        match tables.categories.iter_mut().find(|c| c.id == category.id) {
            Some(slot) => {
                slot.name = category.name.clone();
                slot.slug = category.slug.clone();
                slot.subcategories = category.subcategories.clone();
                slot.updated_at = category.updated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_category(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables()?;
        let before = tables.categories.len();
        tables.categories.retain(|c| c.id != id);
        Ok(tables.categories.len() < before)
    }

    async fn adjust_category_post_count(&self, id: Uuid, delta: i64) -> Result<bool, StoreError> {
        let mut tables = self.tables()?;
        match tables.categories.iter_mut().find(|c| c.id == id) {
            Some(category) => {
                category.post_count = clamp_add(category.post_count, delta);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // --- Tags ---

    async fn insert_tag(&self, tag: &Tag) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        if let Some(field) = tag_conflict(&tables.tags, tag) {
            return Err(StoreError::Duplicate(field));
        }
        tables.tags.push(tag.clone());
        Ok(())
    }

    async fn find_tag(&self, id: Uuid) -> Result<Option<Tag>, StoreError> {
        let tables = self.tables()?;
        Ok(tables.tags.iter().find(|t| t.id == id).cloned())
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, StoreError> {
        let tables = self.tables()?;
        let mut tags = tables.tags.clone();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn list_popular_tags(&self, limit: i64) -> Result<Vec<Tag>, StoreError> {
        let tables = self.tables()?;
        let mut tags = tables.tags.clone();
        tags.sort_by(|a, b| b.post_count.cmp(&a.post_count).then_with(|| a.name.cmp(&b.name)));
        tags.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(tags)
    }

    async fn update_tag(&self, tag: &Tag) -> Result<bool, StoreError> {
        let mut tables = self.tables()?;
        if !tables.tags.iter().any(|t| t.id == tag.id) {
            return Ok(false);
        }
        if let Some(field) = tag_conflict(&tables.tags, tag) {
            return Err(StoreError::Duplicate(field));
        }
        match tables.tags.iter_mut().find(|t| t.id == tag.id) {
            Some(slot) => {
                slot.name = tag.name.clone();
                slot.slug = tag.slug.clone();
                slot.updated_at = tag.updated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_tag(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables()?;
        let before = tables.tags.len();
        tables.tags.retain(|t| t.id != id);
        Ok(tables.tags.len() < before)
    }

    async fn adjust_tag_post_count(&self, slug: &str, delta: i64) -> Result<bool, StoreError> {
        let mut tables = self.tables()?;
        match tables.tags.iter_mut().find(|t| t.slug == slug) {
            Some(tag) => {
                tag.post_count = clamp_add(tag.post_count, delta);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // --- Posts ---

    async fn insert_post(&self, post: &BlogPost) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        if let Some(field) = post_conflict(&tables.posts, post) {
            return Err(StoreError::Duplicate(field));
        }
        tables.posts.push(post.clone());
        Ok(())
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<BlogPost>, StoreError> {
        let tables = self.tables()?;
        Ok(tables.posts.iter().find(|p| p.id == id).cloned())
    }

    async fn find_published_post_by_slug(&self, slug: &str) -> Result<Option<BlogPost>, StoreError> {
        let tables = self.tables()?;
        Ok(tables
            .posts
            .iter()
            .find(|p| p.slug == slug && p.is_published())
            .cloned())
    }

    async fn list_published_posts(&self, filter: &PostFilter) -> Result<Vec<BlogPost>, StoreError> {
        let tables = self.tables()?;
        let mut posts: Vec<BlogPost> = tables
            .posts
            .iter()
            .filter(|p| p.is_published())
            .filter(|p| filter.category.is_none_or(|c| p.category == c))
            .filter(|p| {
                filter
                    .tag
                    .as_deref()
                    .is_none_or(|slug| p.tag_slugs().any(|s| s == slug))
            })
            .filter(|p| filter.featured.is_none_or(|f| p.is_featured == f))
            .cloned()
            .collect();
        posts.sort_by_key(|p| Reverse(p.publish_date));
        Ok(posts)
    }

    async fn list_posts(&self, author_id: Option<Uuid>) -> Result<Vec<BlogPost>, StoreError> {
        let tables = self.tables()?;
        let mut posts: Vec<BlogPost> = tables
            .posts
            .iter()
            .filter(|p| author_id.is_none_or(|id| p.author.id == id))
            .cloned()
            .collect();
        posts.sort_by_key(|p| Reverse(p.created_at));
        Ok(posts)
    }

    async fn update_post(&self, post: &BlogPost) -> Result<bool, StoreError> {
        let mut tables = self.tables()?;
        if !tables.posts.iter().any(|p| p.id == post.id) {
            return Ok(false);
        }
        if let Some(field) = post_conflict(&tables.posts, post) {
            return Err(StoreError::Duplicate(field));
        }
        match tables.posts.iter_mut().find(|p| p.id == post.id) {
            Some(slot) => {
                let comment_count = slot.comment_count;
                let author = slot.author.clone();
                *slot = post.clone();
                slot.comment_count = comment_count;
                slot.author = author;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables()?;
        let before = tables.posts.len();
        tables.posts.retain(|p| p.id != id);
        Ok(tables.posts.len() < before)
    }

    async fn increment_comment_count(&self, post_id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables()?;
        match tables.posts.iter_mut().find(|p| p.id == post_id) {
            Some(post) => {
                post.comment_count += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // --- Comments ---

    async fn insert_comment(&self, comment: &Comment) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        tables.comments.push(comment.clone());
        Ok(())
    }

    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<Comment>, StoreError> {
        let tables = self.tables()?;
        let mut comments: Vec<Comment> = tables
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by_key(|c| c.created_at);
        Ok(comments)
    }

    async fn delete_comments_for_post(&self, post_id: Uuid) -> Result<u64, StoreError> {
        let mut tables = self.tables()?;
        let before = tables.comments.len();
        tables.comments.retain(|c| c.post_id != post_id);
        Ok((before - tables.comments.len()) as u64)
    }
}
