use async_trait::async_trait;
use blog_cms::{
    CounterEngine, MemoryRepository,
    models::{
        Author, AuthorRecord, AuthorSnapshot, BlogPost, Category, Comment, PostFilter,
        PostStatus, SocialLinks, Tag, TagSnapshot,
    },
    repository::{Repository, RepositoryState, StoreError},
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

// --- Fixtures ---

fn category(name: &str) -> Category {
    let now = Utc::now();
    Category {
        id: Uuid::new_v4(),
        name: name.to_string(),
        slug: name.to_lowercase(),
        subcategories: vec![],
        post_count: 0,
        created_at: now,
        updated_at: now,
    }
}

fn tag(name: &str) -> Tag {
    let now = Utc::now();
    Tag {
        id: Uuid::new_v4(),
        name: name.to_string(),
        slug: name.to_lowercase(),
        post_count: 0,
        created_at: now,
        updated_at: now,
    }
}

fn snapshot(tag: &Tag) -> TagSnapshot {
    TagSnapshot {
        name: tag.name.clone(),
        slug: tag.slug.clone(),
    }
}

fn post(title: &str, category: &Category, tags: Vec<TagSnapshot>) -> BlogPost {
    let now = Utc::now();
    BlogPost {
        id: Uuid::new_v4(),
        title: title.to_string(),
        slug: title.to_lowercase().replace(' ', "-"),
        summary: "Summary".to_string(),
        content: "Content".to_string(),
        image_url: "https://img/cover.jpg".to_string(),
        read_time: 4,
        publish_date: now,
        category: category.id,
        author: AuthorSnapshot {
            id: Uuid::new_v4(),
            display_name: "Writer".to_string(),
            profile_image: None,
        },
        tags,
        comment_count: 0,
        is_featured: false,
        status: PostStatus::Published,
        created_at: now,
        updated_at: now,
    }
}

fn comment_on(post_id: Uuid) -> Comment {
    Comment {
        id: Uuid::new_v4(),
        post_id,
        author_name: "Reader".to_string(),
        author_email: "reader@mail.io".to_string(),
        author_number: "555-0100".to_string(),
        author_website: None,
        content: "Nice post".to_string(),
        created_at: Utc::now(),
    }
}

struct Fixture {
    repo: RepositoryState,
    engine: CounterEngine,
    category: Category,
    t1: Tag,
    t2: Tag,
}

async fn fixture() -> Fixture {
    let repo = Arc::new(MemoryRepository::new()) as RepositoryState;
    let category = category("Travel");
    let t1 = tag("Beach");
    let t2 = tag("Mountains");
    repo.insert_category(&category).await.unwrap();
    repo.insert_tag(&t1).await.unwrap();
    repo.insert_tag(&t2).await.unwrap();

    Fixture {
        engine: CounterEngine::new(repo.clone()),
        repo,
        category,
        t1,
        t2,
    }
}

async fn category_count(repo: &RepositoryState, id: Uuid) -> i64 {
    repo.find_category(id).await.unwrap().unwrap().post_count
}

async fn tag_count(repo: &RepositoryState, id: Uuid) -> i64 {
    repo.find_tag(id).await.unwrap().unwrap().post_count
}

// --- Tests ---

#[tokio::test]
async fn test_create_then_delete_restores_every_counter() {
    let f = fixture().await;
    let p = post("Summer Trip", &f.category, vec![snapshot(&f.t1), snapshot(&f.t2)]);

    f.engine.create_post(&p).await.unwrap();
    assert_eq!(category_count(&f.repo, f.category.id).await, 1);
    assert_eq!(tag_count(&f.repo, f.t1.id).await, 1);
    assert_eq!(tag_count(&f.repo, f.t2.id).await, 1);

    assert!(f.engine.delete_post(&p).await.unwrap());
    assert_eq!(category_count(&f.repo, f.category.id).await, 0);
    assert_eq!(tag_count(&f.repo, f.t1.id).await, 0);
    assert_eq!(tag_count(&f.repo, f.t2.id).await, 0);
    assert!(f.repo.find_post(p.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_unknown_tag_slug_is_a_no_op() {
    let f = fixture().await;
    let ghost = TagSnapshot {
        name: "Ghost".to_string(),
        slug: "ghost".to_string(),
    };
    let p = post("Haunted", &f.category, vec![snapshot(&f.t1), ghost]);

    f.engine.create_post(&p).await.unwrap();

    assert_eq!(tag_count(&f.repo, f.t1.id).await, 1);
    assert_eq!(tag_count(&f.repo, f.t2.id).await, 0);
    assert!(f.repo.find_post(p.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_delete_cascades_comments() {
    let f = fixture().await;
    let p = post("Talked About", &f.category, vec![]);
    f.engine.create_post(&p).await.unwrap();
    f.engine.add_comment(&comment_on(p.id)).await.unwrap();
    f.engine.add_comment(&comment_on(p.id)).await.unwrap();
    assert_eq!(f.repo.list_comments(p.id).await.unwrap().len(), 2);

    f.engine.delete_post(&p).await.unwrap();

    assert!(f.repo.list_comments(p.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_comment_submission_bumps_comment_count() {
    let f = fixture().await;
    let p = post("Commented", &f.category, vec![]);
    f.engine.create_post(&p).await.unwrap();

    f.engine.add_comment(&comment_on(p.id)).await.unwrap();

    let stored = f.repo.find_post(p.id).await.unwrap().unwrap();
    assert_eq!(stored.comment_count, 1);
}

#[tokio::test]
async fn test_update_moves_category_and_diffs_tags() {
    let f = fixture().await;
    let other = category("Food");
    f.repo.insert_category(&other).await.unwrap();

    let before = post("Moving", &f.category, vec![snapshot(&f.t1)]);
    f.engine.create_post(&before).await.unwrap();

    let mut after = before.clone();
    after.category = other.id;
    after.tags = vec![snapshot(&f.t2)];
    assert!(f.engine.update_post(&before, &after).await.unwrap());

    assert_eq!(category_count(&f.repo, f.category.id).await, 0);
    assert_eq!(category_count(&f.repo, other.id).await, 1);
    assert_eq!(tag_count(&f.repo, f.t1.id).await, 0);
    assert_eq!(tag_count(&f.repo, f.t2.id).await, 1);
}

#[tokio::test]
async fn test_update_without_taxonomy_change_leaves_counters() {
    let f = fixture().await;
    let before = post("Steady", &f.category, vec![snapshot(&f.t1)]);
    f.engine.create_post(&before).await.unwrap();

    let mut after = before.clone();
    after.title = "Steady, Edited".to_string();
    f.engine.update_post(&before, &after).await.unwrap();

    assert_eq!(category_count(&f.repo, f.category.id).await, 1);
    assert_eq!(tag_count(&f.repo, f.t1.id).await, 1);
}

#[tokio::test]
async fn test_counters_clamp_at_zero() {
    let f = fixture().await;
    // Inserted directly, bypassing the engine: the counters never saw it.
    let p = post("Imported", &f.category, vec![snapshot(&f.t1)]);
    f.repo.insert_post(&p).await.unwrap();

    f.engine.delete_post(&p).await.unwrap();

    assert_eq!(category_count(&f.repo, f.category.id).await, 0);
    assert_eq!(tag_count(&f.repo, f.t1.id).await, 0);
}

#[tokio::test]
async fn test_deleting_missing_post_touches_nothing() {
    let f = fixture().await;
    let p = post("Counted", &f.category, vec![snapshot(&f.t1)]);
    f.engine.create_post(&p).await.unwrap();

    let phantom = post("Never Stored", &f.category, vec![snapshot(&f.t1)]);
    assert!(!f.engine.delete_post(&phantom).await.unwrap());

    assert_eq!(category_count(&f.repo, f.category.id).await, 1);
    assert_eq!(tag_count(&f.repo, f.t1.id).await, 1);
}

#[tokio::test]
async fn test_updating_missing_rows_reports_absence_over_conflicts() {
    let f = fixture().await;
    let stored = post("Taken Title", &f.category, vec![]);
    f.repo.insert_post(&stored).await.unwrap();

    // Same title and slug as a stored post, but an id nothing holds.
    let phantom = post("Taken Title", &f.category, vec![]);
    assert_eq!(f.repo.update_post(&phantom).await, Ok(false));

    let mut ghost_tag = tag("Ghost");
    ghost_tag.name = f.t1.name.clone();
    assert_eq!(f.repo.update_tag(&ghost_tag).await, Ok(false));

    let mut ghost_category = category("Elsewhere");
    ghost_category.slug = f.category.slug.clone();
    assert_eq!(f.repo.update_category(&ghost_category).await, Ok(false));

    assert_eq!(f.repo.find_post(stored.id).await.unwrap().unwrap().title, "Taken Title");
}

// --- Partial application ---

/// Delegates to a `MemoryRepository` but fails every tag counter adjustment.
struct TagCounterOutage {
    inner: MemoryRepository,
}

#[async_trait]
impl Repository for TagCounterOutage {
    async fn insert_author(&self, record: &AuthorRecord) -> Result<(), StoreError> {
        self.inner.insert_author(record).await
    }
    async fn find_author(&self, id: Uuid) -> Result<Option<AuthorRecord>, StoreError> {
        self.inner.find_author(id).await
    }
    async fn find_author_by_email(&self, email: &str) -> Result<Option<AuthorRecord>, StoreError> {
        self.inner.find_author_by_email(email).await
    }
    async fn list_authors(&self) -> Result<Vec<Author>, StoreError> {
        self.inner.list_authors().await
    }
    async fn update_author(&self, record: &AuthorRecord) -> Result<bool, StoreError> {
        self.inner.update_author(record).await
    }
    async fn delete_author(&self, id: Uuid) -> Result<bool, StoreError> {
        self.inner.delete_author(id).await
    }
    async fn insert_category(&self, category: &Category) -> Result<(), StoreError> {
        self.inner.insert_category(category).await
    }
    async fn find_category(&self, id: Uuid) -> Result<Option<Category>, StoreError> {
        self.inner.find_category(id).await
    }
    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        self.inner.list_categories().await
    }
    async fn update_category(&self, category: &Category) -> Result<bool, StoreError> {
        self.inner.update_category(category).await
    }
    async fn delete_category(&self, id: Uuid) -> Result<bool, StoreError> {
        self.inner.delete_category(id).await
    }
    async fn adjust_category_post_count(&self, id: Uuid, delta: i64) -> Result<bool, StoreError> {
        self.inner.adjust_category_post_count(id, delta).await
    }
    async fn insert_tag(&self, tag: &Tag) -> Result<(), StoreError> {
        self.inner.insert_tag(tag).await
    }
    async fn find_tag(&self, id: Uuid) -> Result<Option<Tag>, StoreError> {
        self.inner.find_tag(id).await
    }
    async fn list_tags(&self) -> Result<Vec<Tag>, StoreError> {
        self.inner.list_tags().await
    }
    async fn list_popular_tags(&self, limit: i64) -> Result<Vec<Tag>, StoreError> {
        self.inner.list_popular_tags(limit).await
    }
    async fn update_tag(&self, tag: &Tag) -> Result<bool, StoreError> {
        self.inner.update_tag(tag).await
    }
    async fn delete_tag(&self, id: Uuid) -> Result<bool, StoreError> {
        self.inner.delete_tag(id).await
    }
    async fn adjust_tag_post_count(&self, _slug: &str, _delta: i64) -> Result<bool, StoreError> {
        Err(StoreError::Backend("tag collection unavailable".to_string()))
    }
    async fn insert_post(&self, post: &BlogPost) -> Result<(), StoreError> {
        self.inner.insert_post(post).await
    }
    async fn find_post(&self, id: Uuid) -> Result<Option<BlogPost>, StoreError> {
        self.inner.find_post(id).await
    }
    async fn find_published_post_by_slug(&self, slug: &str) -> Result<Option<BlogPost>, StoreError> {
        self.inner.find_published_post_by_slug(slug).await
    }
    async fn list_published_posts(&self, filter: &PostFilter) -> Result<Vec<BlogPost>, StoreError> {
        self.inner.list_published_posts(filter).await
    }
    async fn list_posts(&self, author_id: Option<Uuid>) -> Result<Vec<BlogPost>, StoreError> {
        self.inner.list_posts(author_id).await
    }
    async fn update_post(&self, post: &BlogPost) -> Result<bool, StoreError> {
        self.inner.update_post(post).await
    }
    async fn delete_post(&self, id: Uuid) -> Result<bool, StoreError> {
        self.inner.delete_post(id).await
    }
    async fn increment_comment_count(&self, post_id: Uuid) -> Result<bool, StoreError> {
        self.inner.increment_comment_count(post_id).await
    }
    async fn insert_comment(&self, comment: &Comment) -> Result<(), StoreError> {
        self.inner.insert_comment(comment).await
    }
    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<Comment>, StoreError> {
        self.inner.list_comments(post_id).await
    }
    async fn delete_comments_for_post(&self, post_id: Uuid) -> Result<u64, StoreError> {
        self.inner.delete_comments_for_post(post_id).await
    }
}

#[tokio::test]
async fn test_failed_step_keeps_earlier_steps_applied() {
    let repo = Arc::new(TagCounterOutage {
        inner: MemoryRepository::new(),
    }) as RepositoryState;
    let engine = CounterEngine::new(repo.clone());
    let travel = category("Travel");
    let beach = tag("Beach");
    repo.insert_category(&travel).await.unwrap();
    repo.insert_tag(&beach).await.unwrap();

    let p = post("Half Done", &travel, vec![snapshot(&beach)]);
    let err = engine.create_post(&p).await.unwrap_err();

    assert!(matches!(err, StoreError::Backend(_)));
    // No rollback: the post and the category increment remain.
    assert!(repo.find_post(p.id).await.unwrap().is_some());
    assert_eq!(category_count(&repo, travel.id).await, 1);
    assert_eq!(tag_count(&repo, beach.id).await, 0);
}
