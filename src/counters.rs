use std::collections::BTreeSet;

use uuid::Uuid;

use crate::{
    models::{BlogPost, Comment},
    repository::{RepositoryState, StoreError},
};

/// CounterEngine
///
/// Keeps the denormalized counters in step with post and comment writes:
/// `Category.post_count` and `Tag.post_count` follow post creation, deletion and
/// re-categorisation; `BlogPost.comment_count` follows comment submission.
///
/// Each step is its own repository call. Nothing is transactional: if a later step fails
/// the earlier ones stay applied, the partial application is logged and the error is
/// returned. Concurrent sequences may interleave and drift the counters; decrements clamp
/// at zero in the repository.
#[derive(Clone)]
pub struct CounterEngine {
    repo: RepositoryState,
}

impl CounterEngine {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    /// Inserts the post, then bumps its category and each of its tags (by slug).
    pub async fn create_post(&self, post: &BlogPost) -> Result<(), StoreError> {
        self.repo.insert_post(post).await?;

        self.adjust_category(post.id, post.category, 1).await?;
        for slug in unique_slugs(post) {
            self.adjust_tag(post.id, slug, 1).await?;
        }

        tracing::debug!(post_id = %post.id, "post created with counters applied");
        Ok(())
    }

    /// update_post
    ///
    /// Persists `after` and reconciles counters against `before`: a category change moves
    /// one count from the old category to the new one; removed tags lose one, added tags
    /// gain one. Returns false if the post no longer exists, in which case no counters
    /// are touched.
    pub async fn update_post(&self, before: &BlogPost, after: &BlogPost) -> Result<bool, StoreError> {
        if !self.repo.update_post(after).await? {
            return Ok(false);
        }

        if before.category != after.category {
            self.adjust_category(after.id, before.category, -1).await?;
            self.adjust_category(after.id, after.category, 1).await?;
        }

        let old_tags = unique_slugs(before);
        let new_tags = unique_slugs(after);
        for slug in old_tags.difference(&new_tags) {
            self.adjust_tag(after.id, slug, -1).await?;
        }
        for slug in new_tags.difference(&old_tags) {
            self.adjust_tag(after.id, slug, 1).await?;
        }

        Ok(true)
    }

    /// delete_post
    ///
    /// Deletes the post, cascades its comments, then decrements its category and tags.
    /// Returns false if the post was already gone.
    pub async fn delete_post(&self, post: &BlogPost) -> Result<bool, StoreError> {
        if !self.repo.delete_post(post.id).await? {
            return Ok(false);
        }

        let removed = self
            .repo
            .delete_comments_for_post(post.id)
            .await
            .inspect_err(|e| partial_application(post.id, "comment cascade", e))?;

        self.adjust_category(post.id, post.category, -1).await?;
        for slug in unique_slugs(post) {
            self.adjust_tag(post.id, slug, -1).await?;
        }

        tracing::debug!(post_id = %post.id, comments_removed = removed, "post deleted");
        Ok(true)
    }

    /// Stores the comment, then bumps the parent's comment count. There is no decrement path.
    pub async fn add_comment(&self, comment: &Comment) -> Result<(), StoreError> {
        self.repo.insert_comment(comment).await?;

        self.repo
            .increment_comment_count(comment.post_id)
            .await
            .inspect_err(|e| partial_application(comment.post_id, "comment count increment", e))?;

        Ok(())
    }

    async fn adjust_category(&self, post_id: Uuid, category: Uuid, delta: i64) -> Result<(), StoreError> {
        let found = self
            .repo
            .adjust_category_post_count(category, delta)
            .await
            .inspect_err(|e| partial_application(post_id, "category count", e))?;

        if !found {
            tracing::debug!(%post_id, category_id = %category, "category absent, count not adjusted");
        }
        Ok(())
    }

    async fn adjust_tag(&self, post_id: Uuid, slug: &str, delta: i64) -> Result<(), StoreError> {
        let found = self
            .repo
            .adjust_tag_post_count(slug, delta)
            .await
            .inspect_err(|e| partial_application(post_id, "tag count", e))?;

        if !found {
            tracing::debug!(%post_id, tag = slug, "tag absent, count not adjusted");
        }
        Ok(())
    }
}

fn unique_slugs(post: &BlogPost) -> BTreeSet<&str> {
    post.tag_slugs().filter(|slug| !slug.is_empty()).collect()
}

fn partial_application(post_id: Uuid, stage: &str, err: &StoreError) {
    tracing::warn!(
        %post_id,
        stage,
        error = %err,
        "counter sequence stopped part-way; earlier steps remain applied"
    );
}
