use super::{Repository, StoreError, UniqueField};
use crate::models::{
    Author, AuthorRecord, AuthorSnapshot, BlogPost, Category, Comment, PostFilter, SocialLinks,
    Subcategory, Tag, TagSnapshot,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, query_builder::QueryBuilder, types::Json};
use uuid::Uuid;

macro_rules! author_columns {
    () => {
        "id, email, password_hash, display_name, title, bio, profile_image, social_links, created_at, updated_at"
    };
}

macro_rules! category_columns {
    () => {
        "id, name, slug, subcategories, post_count, created_at, updated_at"
    };
}

macro_rules! tag_columns {
    () => {
        "id, name, slug, post_count, created_at, updated_at"
    };
}

macro_rules! post_columns {
    () => {
        "id, title, slug, summary, content, image_url, read_time, publish_date, category_id, \
         author_id, author_display_name, author_profile_image, tags, comment_count, is_featured, \
         status, created_at, updated_at"
    };
}

macro_rules! comment_columns {
    () => {
        "id, post_id, author_name, author_email, author_number, author_website, content, created_at"
    };
}

// --- Row Mappings ---

#[derive(FromRow)]
struct AuthorRow {
    id: Uuid,
    email: String,
    password_hash: String,
    display_name: String,
    title: Option<String>,
    bio: Option<String>,
    profile_image: Option<String>,
    social_links: Json<SocialLinks>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AuthorRow> for AuthorRecord {
    fn from(row: AuthorRow) -> Self {
        AuthorRecord {
            author: Author {
                id: row.id,
                email: row.email,
                display_name: row.display_name,
                title: row.title,
                bio: row.bio,
                profile_image: row.profile_image,
                social_links: row.social_links.0,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            password_hash: row.password_hash,
        }
    }
}

#[derive(FromRow)]
struct CategoryRow {
    id: Uuid,
    name: String,
    slug: String,
    subcategories: Json<Vec<Subcategory>>,
    post_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id,
            name: row.name,
            slug: row.slug,
            subcategories: row.subcategories.0,
            post_count: row.post_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// The author snapshot is flattened into three columns; tags are stored as a JSONB array.
#[derive(FromRow)]
struct PostRow {
    id: Uuid,
    title: String,
    slug: String,
    summary: String,
    content: String,
    image_url: String,
    read_time: i32,
    publish_date: DateTime<Utc>,
    category_id: Uuid,
    author_id: Uuid,
    author_display_name: String,
    author_profile_image: Option<String>,
    tags: Json<Vec<TagSnapshot>>,
    comment_count: i64,
    is_featured: bool,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PostRow> for BlogPost {
    type Error = StoreError;

    fn try_from(row: PostRow) -> Result<Self, Self::Error> {
        let status = row.status.parse().map_err(StoreError::Backend)?;
        Ok(BlogPost {
            id: row.id,
            title: row.title,
            slug: row.slug,
            summary: row.summary,
            content: row.content,
            image_url: row.image_url,
            read_time: row.read_time,
            publish_date: row.publish_date,
            category: row.category_id,
            author: AuthorSnapshot {
                id: row.author_id,
                display_name: row.author_display_name,
                profile_image: row.author_profile_image,
            },
            tags: row.tags.0,
            comment_count: row.comment_count,
            is_featured: row.is_featured,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_posts(rows: Vec<PostRow>) -> Result<Vec<BlogPost>, StoreError> {
    rows.into_iter().map(BlogPost::try_from).collect()
}

/// store_error
///
/// Translates a sqlx error into a `StoreError`. Unique violations on one of the named
/// `<table>_<column>_key` constraints become `Duplicate`; everything else is logged and
/// reduced to a diagnostic message.
fn store_error(context: &'static str, err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            if let Some(field) = db_err.constraint().and_then(UniqueField::from_constraint) {
                return StoreError::Duplicate(field);
            }
        }
    }
    tracing::error!("{} error: {:?}", context, err);
    StoreError::Backend(format!("{context} failed"))
}

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL. Queries are checked at runtime
/// (no compile-time database connection needed) and counters are updated with single
/// atomic `UPDATE` statements.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- Authors ---

    async fn insert_author(&self, record: &AuthorRecord) -> Result<(), StoreError> {
        let author = &record.author;
        sqlx::query(concat!(
            "INSERT INTO authors (",
            author_columns!(),
            ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
        ))
        .bind(author.id)
        .bind(&author.email)
        .bind(&record.password_hash)
        .bind(&author.display_name)
        .bind(&author.title)
        .bind(&author.bio)
        .bind(&author.profile_image)
        .bind(Json(&author.social_links))
        .bind(author.created_at)
        .bind(author.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| store_error("insert_author", e))?;
        Ok(())
    }

    async fn find_author(&self, id: Uuid) -> Result<Option<AuthorRecord>, StoreError> {
        let row = sqlx::query_as::<_, AuthorRow>(concat!(
            "SELECT ",
            author_columns!(),
            " FROM authors WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("find_author", e))?;
        Ok(row.map(AuthorRecord::from))
    }

    async fn find_author_by_email(&self, email: &str) -> Result<Option<AuthorRecord>, StoreError> {
        let row = sqlx::query_as::<_, AuthorRow>(concat!(
            "SELECT ",
            author_columns!(),
            " FROM authors WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("find_author_by_email", e))?;
        Ok(row.map(AuthorRecord::from))
    }

    async fn list_authors(&self) -> Result<Vec<Author>, StoreError> {
        let rows = sqlx::query_as::<_, AuthorRow>(concat!(
            "SELECT ",
            author_columns!(),
            " FROM authors ORDER BY display_name ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error("list_authors", e))?;
        Ok(rows
            .into_iter()
            .map(|row| AuthorRecord::from(row).into_author())
            .collect())
    }

    async fn update_author(&self, record: &AuthorRecord) -> Result<bool, StoreError> {
        let author = &record.author;
        let result = sqlx::query(
            r#"
            UPDATE authors
            SET email = $2,
                password_hash = $3,
                display_name = $4,
                title = $5,
                bio = $6,
                profile_image = $7,
                social_links = $8,
                updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(author.id)
        .bind(&author.email)
        .bind(&record.password_hash)
        .bind(&author.display_name)
        .bind(&author.title)
        .bind(&author.bio)
        .bind(&author.profile_image)
        .bind(Json(&author.social_links))
        .bind(author.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| store_error("update_author", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_author(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM authors WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| store_error("delete_author", e))?;
        Ok(result.rows_affected() > 0)
    }

    // --- Categories ---

    async fn insert_category(&self, category: &Category) -> Result<(), StoreError> {
        sqlx::query(concat!(
            "INSERT INTO categories (",
            category_columns!(),
            ") VALUES ($1, $2, $3, $4, $5, $6, $7)"
        ))
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.slug)
        .bind(Json(&category.subcategories))
        .bind(category.post_count)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| store_error("insert_category", e))?;
        Ok(())
    }

    async fn find_category(&self, id: Uuid) -> Result<Option<Category>, StoreError> {
        let row = sqlx::query_as::<_, CategoryRow>(concat!(
            "SELECT ",
            category_columns!(),
            " FROM categories WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("find_category", e))?;
        Ok(row.map(Category::from))
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let rows = sqlx::query_as::<_, CategoryRow>(concat!(
            "SELECT ",
            category_columns!(),
            " FROM categories ORDER BY name ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error("list_categories", e))?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn update_category(&self, category: &Category) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE categories SET name = $2, slug = $3, subcategories = $4, updated_at = $5 WHERE id = $1",
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.slug)
        .bind(Json(&category.subcategories))
        .bind(category.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| store_error("update_category", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_category(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| store_error("delete_category", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn adjust_category_post_count(&self, id: Uuid, delta: i64) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE categories SET post_count = GREATEST(post_count + $2, 0) WHERE id = $1",
        )
        .bind(id)
        .bind(delta)
        .execute(&self.pool)
        .await
        .map_err(|e| store_error("adjust_category_post_count", e))?;
        Ok(result.rows_affected() > 0)
    }

    // --- Tags ---

    async fn insert_tag(&self, tag: &Tag) -> Result<(), StoreError> {
        sqlx::query(concat!(
            "INSERT INTO tags (",
            tag_columns!(),
            ") VALUES ($1, $2, $3, $4, $5, $6)"
        ))
        .bind(tag.id)
        .bind(&tag.name)
        .bind(&tag.slug)
        .bind(tag.post_count)
        .bind(tag.created_at)
        .bind(tag.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| store_error("insert_tag", e))?;
        Ok(())
    }

    async fn find_tag(&self, id: Uuid) -> Result<Option<Tag>, StoreError> {
        sqlx::query_as::<_, Tag>(concat!("SELECT ", tag_columns!(), " FROM tags WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_error("find_tag", e))
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, StoreError> {
        sqlx::query_as::<_, Tag>(concat!("SELECT ", tag_columns!(), " FROM tags ORDER BY name ASC"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| store_error("list_tags", e))
    }

    async fn list_popular_tags(&self, limit: i64) -> Result<Vec<Tag>, StoreError> {
        sqlx::query_as::<_, Tag>(concat!(
            "SELECT ",
            tag_columns!(),
            " FROM tags ORDER BY post_count DESC, name ASC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error("list_popular_tags", e))
    }

    async fn update_tag(&self, tag: &Tag) -> Result<bool, StoreError> {
        let result =
            sqlx::query("UPDATE tags SET name = $2, slug = $3, updated_at = $4 WHERE id = $1")
                .bind(tag.id)
                .bind(&tag.name)
                .bind(&tag.slug)
                .bind(tag.updated_at)
                .execute(&self.pool)
                .await
                .map_err(|e| store_error("update_tag", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_tag(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM tags WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| store_error("delete_tag", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn adjust_tag_post_count(&self, slug: &str, delta: i64) -> Result<bool, StoreError> {
        let result =
            sqlx::query("UPDATE tags SET post_count = GREATEST(post_count + $2, 0) WHERE slug = $1")
                .bind(slug)
                .bind(delta)
                .execute(&self.pool)
                .await
                .map_err(|e| store_error("adjust_tag_post_count", e))?;
        Ok(result.rows_affected() > 0)
    }

    // --- Posts ---

    async fn insert_post(&self, post: &BlogPost) -> Result<(), StoreError> {
        sqlx::query(concat!(
            "INSERT INTO posts (",
            post_columns!(),
            ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)"
        ))
        .bind(post.id)
        .bind(&post.title)
        .bind(&post.slug)
        .bind(&post.summary)
        .bind(&post.content)
        .bind(&post.image_url)
        .bind(post.read_time)
        .bind(post.publish_date)
        .bind(post.category)
        .bind(post.author.id)
        .bind(&post.author.display_name)
        .bind(&post.author.profile_image)
        .bind(Json(&post.tags))
        .bind(post.comment_count)
        .bind(post.is_featured)
        .bind(post.status.as_str())
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| store_error("insert_post", e))?;
        Ok(())
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<BlogPost>, StoreError> {
        sqlx::query_as::<_, PostRow>(concat!("SELECT ", post_columns!(), " FROM posts WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_error("find_post", e))?
            .map(BlogPost::try_from)
            .transpose()
    }

    /// The `status = 'published'` restriction lives in the query itself.
    async fn find_published_post_by_slug(&self, slug: &str) -> Result<Option<BlogPost>, StoreError> {
        sqlx::query_as::<_, PostRow>(concat!(
            "SELECT ",
            post_columns!(),
            " FROM posts WHERE slug = $1 AND status = 'published'"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("find_published_post_by_slug", e))?
        .map(BlogPost::try_from)
        .transpose()
    }

    /// list_published_posts
    ///
    /// Builds the listing with `QueryBuilder` so every filter value is bound, never
    /// interpolated. The published restriction is part of the base query; filters can only
    /// narrow it.
    async fn list_published_posts(&self, filter: &PostFilter) -> Result<Vec<BlogPost>, StoreError> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(concat!(
            "SELECT ",
            post_columns!(),
            " FROM posts WHERE status = 'published'"
        ));

        if let Some(category) = filter.category {
            builder.push(" AND category_id = ");
            builder.push_bind(category);
        }

        if let Some(tag) = &filter.tag {
            // JSONB containment: the tags array holds an element with this slug.
            builder.push(" AND tags @> ");
            builder.push_bind(Json(serde_json::json!([{ "slug": tag }])));
        }

        if let Some(featured) = filter.featured {
            builder.push(" AND is_featured = ");
            builder.push_bind(featured);
        }

        builder.push(" ORDER BY publish_date DESC");

        let rows = builder
            .build_query_as::<PostRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| store_error("list_published_posts", e))?;
        into_posts(rows)
    }

    async fn list_posts(&self, author_id: Option<Uuid>) -> Result<Vec<BlogPost>, StoreError> {
        let rows = match author_id {
            Some(author_id) => {
                sqlx::query_as::<_, PostRow>(concat!(
                    "SELECT ",
                    post_columns!(),
                    " FROM posts WHERE author_id = $1 ORDER BY created_at DESC"
                ))
                .bind(author_id)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, PostRow>(concat!(
                    "SELECT ",
                    post_columns!(),
                    " FROM posts ORDER BY created_at DESC"
                ))
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| store_error("list_posts", e))?;
        into_posts(rows)
    }

    async fn update_post(&self, post: &BlogPost) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE posts
            SET title = $2,
                slug = $3,
                summary = $4,
                content = $5,
                image_url = $6,
                read_time = $7,
                publish_date = $8,
                category_id = $9,
                tags = $10,
                is_featured = $11,
                status = $12,
                updated_at = $13
            WHERE id = $1
            "#,
        )
        .bind(post.id)
        .bind(&post.title)
        .bind(&post.slug)
        .bind(&post.summary)
        .bind(&post.content)
        .bind(&post.image_url)
        .bind(post.read_time)
        .bind(post.publish_date)
        .bind(post.category)
        .bind(Json(&post.tags))
        .bind(post.is_featured)
        .bind(post.status.as_str())
        .bind(post.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| store_error("update_post", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| store_error("delete_post", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn increment_comment_count(&self, post_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE posts SET comment_count = comment_count + 1 WHERE id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await
            .map_err(|e| store_error("increment_comment_count", e))?;
        Ok(result.rows_affected() > 0)
    }

    // --- Comments ---

    async fn insert_comment(&self, comment: &Comment) -> Result<(), StoreError> {
        sqlx::query(concat!(
            "INSERT INTO comments (",
            comment_columns!(),
            ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        ))
        .bind(comment.id)
        .bind(comment.post_id)
        .bind(&comment.author_name)
        .bind(&comment.author_email)
        .bind(&comment.author_number)
        .bind(&comment.author_website)
        .bind(&comment.content)
        .bind(comment.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| store_error("insert_comment", e))?;
        Ok(())
    }

    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<Comment>, StoreError> {
        sqlx::query_as::<_, Comment>(concat!(
            "SELECT ",
            comment_columns!(),
            " FROM comments WHERE post_id = $1 ORDER BY created_at ASC"
        ))
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error("list_comments", e))
    }

    async fn delete_comments_for_post(&self, post_id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM comments WHERE post_id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await
            .map_err(|e| store_error("delete_comments_for_post", e))?;
        Ok(result.rows_affected())
    }
}
