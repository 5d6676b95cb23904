use crate::models::{Blog, Comment, CreateBlogRequest, NewComment, UpdateBlogRequest, UpdateCommentRequest, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::{collections::HashMap, sync::Arc};
use uuid::Uuid;

/// Name of the unique constraint guarding `blogs.title`.
const TITLE_CONSTRAINT: &str = "blogs_title_key";

/// RepositoryError
///
/// Failures surfaced by the persistence layer. Driver errors are never swallowed;
/// they travel up to the handler and become a 500.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("duplicate blog title: {0}")]
    DuplicateTitle(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// CommentMutation
///
/// Outcome of an author-gated comment update or delete. The variants let the
/// handler tell a missing blog, a missing comment and a foreign comment apart.
#[derive(Debug, Clone, PartialEq)]
pub enum CommentMutation {
    Applied(Blog),
    BlogNotFound,
    CommentNotFound,
    NotAuthor,
}

/// Repository Trait
///
/// Abstract contract for every persistence operation the blog API performs.
/// Handlers only ever see `Arc<dyn Repository>`, so the Postgres implementation
/// can be swapped for an in-memory one in tests.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepositoryError>;

    // --- Blogs ---
    // Full scan, insertion order, comment authors populated.
    async fn list_blogs(&self) -> Result<Vec<Blog>, RepositoryError>;
    async fn get_blog(&self, id: Uuid) -> Result<Option<Blog>, RepositoryError>;
    // Fails with DuplicateTitle when the title is taken.
    async fn create_blog(&self, req: CreateBlogRequest) -> Result<Blog, RepositoryError>;
    // Merges only the supplied fields. `None` when the blog does not exist.
    async fn update_blog(&self, id: Uuid, req: UpdateBlogRequest) -> Result<Option<Blog>, RepositoryError>;
    // Returns the number of removed blogs.
    async fn delete_blogs(&self) -> Result<u64, RepositoryError>;
    // Returns the removed blog, if any.
    async fn delete_blog(&self, id: Uuid) -> Result<Option<Blog>, RepositoryError>;

    // --- Embedded Comments ---
    // Appends to the blog's comment sequence. `None` when the blog does not exist.
    async fn add_comment(&self, blog_id: Uuid, comment: NewComment) -> Result<Option<Blog>, RepositoryError>;
    // Removes every comment on the blog. `None` when the blog does not exist.
    async fn clear_comments(&self, blog_id: Uuid) -> Result<Option<Blog>, RepositoryError>;
    /// Applies `rating`/`text` only if `author_id` owns the comment.
    async fn update_comment(
        &self,
        blog_id: Uuid,
        comment_id: Uuid,
        author_id: Uuid,
        req: UpdateCommentRequest,
    ) -> Result<CommentMutation, RepositoryError>;
    /// Removes the comment only if `author_id` owns it.
    async fn delete_comment(
        &self,
        blog_id: Uuid,
        comment_id: Uuid,
        author_id: Uuid,
    ) -> Result<CommentMutation, RepositoryError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

// --- Row Types ---

#[derive(FromRow)]
struct BlogRow {
    id: Uuid,
    author: String,
    title: String,
    image: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BlogRow {
    fn into_blog(self, comments: Vec<Comment>) -> Blog {
        Blog {
            id: self.id,
            author: self.author,
            title: self.title,
            image: self.image,
            description: self.description,
            comments,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// A comment joined with its (optional) author.
#[derive(FromRow)]
struct CommentRow {
    id: Uuid,
    blog_id: Uuid,
    name: String,
    email: String,
    text: String,
    rating: Option<f64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    author_id: Option<Uuid>,
    author_username: Option<String>,
    author_email: Option<String>,
    author_role: Option<String>,
}

impl CommentRow {
    fn into_comment(self) -> Comment {
        let author = match (self.author_id, self.author_username, self.author_email, self.author_role) {
            (Some(id), Some(username), Some(email), Some(role)) => Some(User {
                id,
                username,
                email,
                role,
            }),
            _ => None,
        };

        Comment {
            id: self.id,
            name: self.name,
            email: self.email,
            text: self.text,
            rating: self.rating,
            author,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

const BLOG_COLUMNS: &str = "id, author, title, image, description, created_at, updated_at";

const POPULATED_COMMENTS: &str = r#"
    SELECT
        c.id, c.blog_id, c.name, c.email, c.text, c.rating, c.created_at, c.updated_at,
        u.id AS author_id, u.username AS author_username,
        u.email AS author_email, u.role AS author_role
    FROM blog_comments c
    LEFT JOIN users u ON u.id = c.author_id
    WHERE c.blog_id = ANY($1)
    ORDER BY c.blog_id, c.position ASC
"#;

/// PostgresRepository
///
/// `Repository` backed by PostgreSQL. Blogs live in `blogs`; their embedded
/// comments live in `blog_comments` and cascade with the parent row.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads the populated comments of every blog in `blog_ids`, grouped by blog.
    async fn load_comments<'e, E>(
        executor: E,
        blog_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<Comment>>, RepositoryError>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, CommentRow>(POPULATED_COMMENTS)
            .bind(blog_ids)
            .fetch_all(executor)
            .await?;

        let mut grouped: HashMap<Uuid, Vec<Comment>> = HashMap::new();
        for row in rows {
            grouped.entry(row.blog_id).or_default().push(row.into_comment());
        }
        Ok(grouped)
    }

    /// Re-reads a blog with its comments inside an open transaction.
    async fn reload(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> Result<Option<Blog>, RepositoryError> {
        let row = sqlx::query_as::<_, BlogRow>(&format!("SELECT {BLOG_COLUMNS} FROM blogs WHERE id = $1"))
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut comments = Self::load_comments(&mut **tx, &[id]).await?;
        Ok(Some(row.into_blog(comments.remove(&id).unwrap_or_default())))
    }

    /// Explains why an author-gated comment statement matched nothing.
    async fn diagnose_comment_miss(
        tx: &mut Transaction<'_, Postgres>,
        blog_id: Uuid,
        comment_id: Uuid,
    ) -> Result<CommentMutation, RepositoryError> {
        let blog_exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM blogs WHERE id = $1)")
            .bind(blog_id)
            .fetch_one(&mut **tx)
            .await?;
        if !blog_exists {
            return Ok(CommentMutation::BlogNotFound);
        }

        let comment_exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM blog_comments WHERE id = $1 AND blog_id = $2)")
                .bind(comment_id)
                .bind(blog_id)
                .fetch_one(&mut **tx)
                .await?;
        if !comment_exists {
            return Ok(CommentMutation::CommentNotFound);
        }

        Ok(CommentMutation::NotAuthor)
    }

    /// Bumps `updated_at` and holds the blog row lock until the transaction ends.
    async fn touch_blog(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> Result<bool, RepositoryError> {
        let res = sqlx::query("UPDATE blogs SET updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

/// Maps a unique violation on the title constraint to `DuplicateTitle`.
fn map_title_conflict(e: sqlx::Error, title: &str) -> RepositoryError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() && db_err.constraint() == Some(TITLE_CONSTRAINT) {
            return RepositoryError::DuplicateTitle(title.to_string());
        }
    }
    RepositoryError::Database(e)
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>("SELECT id, username, email, role FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// list_blogs
    ///
    /// Two queries regardless of blog count: one for the blogs, one for every
    /// comment joined with its author.
    async fn list_blogs(&self) -> Result<Vec<Blog>, RepositoryError> {
        let rows = sqlx::query_as::<_, BlogRow>(&format!("SELECT {BLOG_COLUMNS} FROM blogs ORDER BY created_at ASC"))
            .fetch_all(&self.pool)
            .await?;

        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let mut comments = Self::load_comments(&self.pool, &ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let blog_comments = comments.remove(&row.id).unwrap_or_default();
                row.into_blog(blog_comments)
            })
            .collect())
    }

    async fn get_blog(&self, id: Uuid) -> Result<Option<Blog>, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let blog = Self::reload(&mut tx, id).await?;
        tx.commit().await?;
        Ok(blog)
    }

    async fn create_blog(&self, req: CreateBlogRequest) -> Result<Blog, RepositoryError> {
        let row = sqlx::query_as::<_, BlogRow>(&format!(
            "INSERT INTO blogs (id, author, title, image, description, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, NOW(), NOW()) RETURNING {BLOG_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&req.author)
        .bind(&req.title)
        .bind(&req.image)
        .bind(&req.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_title_conflict(e, &req.title))?;

        Ok(row.into_blog(Vec::new()))
    }

    /// update_blog
    ///
    /// `COALESCE` keeps every column whose replacement was not supplied.
    async fn update_blog(&self, id: Uuid, req: UpdateBlogRequest) -> Result<Option<Blog>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE blogs
            SET author = COALESCE($2, author),
                title = COALESCE($3, title),
                image = COALESCE($4, image),
                description = COALESCE($5, description),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&req.author)
        .bind(&req.title)
        .bind(&req.image)
        .bind(&req.description)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_title_conflict(e, req.title.as_deref().unwrap_or_default()))?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        let blog = Self::reload(&mut tx, id).await?;
        tx.commit().await?;
        Ok(blog)
    }

    async fn delete_blogs(&self) -> Result<u64, RepositoryError> {
        let res = sqlx::query("DELETE FROM blogs").execute(&self.pool).await?;
        Ok(res.rows_affected())
    }

    /// delete_blog
    ///
    /// The comment rows go with the blog through `ON DELETE CASCADE`.
    async fn delete_blog(&self, id: Uuid) -> Result<Option<Blog>, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let blog = Self::reload(&mut tx, id).await?;

        if blog.is_some() {
            sqlx::query("DELETE FROM blogs WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(blog)
    }

    async fn add_comment(&self, blog_id: Uuid, comment: NewComment) -> Result<Option<Blog>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Locks the parent row so the insert cannot race a blog delete.
        if !Self::touch_blog(&mut tx, blog_id).await? {
            return Ok(None);
        }

        sqlx::query(
            r#"
            INSERT INTO blog_comments (id, blog_id, name, email, text, rating, author_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW())
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(blog_id)
        .bind(&comment.name)
        .bind(&comment.email)
        .bind(&comment.text)
        .bind(comment.rating)
        .bind(comment.author_id)
        .execute(&mut *tx)
        .await?;

        let blog = Self::reload(&mut tx, blog_id).await?;
        tx.commit().await?;
        Ok(blog)
    }

    async fn clear_comments(&self, blog_id: Uuid) -> Result<Option<Blog>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if !Self::touch_blog(&mut tx, blog_id).await? {
            return Ok(None);
        }

        sqlx::query("DELETE FROM blog_comments WHERE blog_id = $1")
            .bind(blog_id)
            .execute(&mut *tx)
            .await?;

        let blog = Self::reload(&mut tx, blog_id).await?;
        tx.commit().await?;
        Ok(blog)
    }

    /// update_comment
    ///
    /// A single conditional UPDATE keyed by blog, comment and author, so two
    /// concurrent edits never overwrite each other's untouched fields.
    ///
    /// The parent row is locked before any comment row, the same order as
    /// `clear_comments` and the cascading `delete_blog`.
    async fn update_comment(
        &self,
        blog_id: Uuid,
        comment_id: Uuid,
        author_id: Uuid,
        req: UpdateCommentRequest,
    ) -> Result<CommentMutation, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if !Self::touch_blog(&mut tx, blog_id).await? {
            tx.rollback().await?;
            return Ok(CommentMutation::BlogNotFound);
        }

        let res = sqlx::query(
            r#"
            UPDATE blog_comments
            SET rating = COALESCE($4, rating),
                text = COALESCE($5, text),
                updated_at = NOW()
            WHERE blog_id = $1 AND id = $2 AND author_id = $3
            "#,
        )
        .bind(blog_id)
        .bind(comment_id)
        .bind(author_id)
        .bind(req.rating)
        .bind(&req.text)
        .execute(&mut *tx)
        .await?;

        if res.rows_affected() == 0 {
            let outcome = Self::diagnose_comment_miss(&mut tx, blog_id, comment_id).await?;
            tx.rollback().await?;
            return Ok(outcome);
        }

        let blog = Self::reload(&mut tx, blog_id).await?;
        tx.commit().await?;

        Ok(blog.map_or(CommentMutation::BlogNotFound, CommentMutation::Applied))
    }

    async fn delete_comment(
        &self,
        blog_id: Uuid,
        comment_id: Uuid,
        author_id: Uuid,
    ) -> Result<CommentMutation, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Parent first.
        if !Self::touch_blog(&mut tx, blog_id).await? {
            tx.rollback().await?;
            return Ok(CommentMutation::BlogNotFound);
        }

        let res = sqlx::query("DELETE FROM blog_comments WHERE blog_id = $1 AND id = $2 AND author_id = $3")
            .bind(blog_id)
            .bind(comment_id)
            .bind(author_id)
            .execute(&mut *tx)
            .await?;

        if res.rows_affected() == 0 {
            let outcome = Self::diagnose_comment_miss(&mut tx, blog_id, comment_id).await?;
            tx.rollback().await?;
            return Ok(outcome);
        }

        let blog = Self::reload(&mut tx, blog_id).await?;
        tx.commit().await?;

        Ok(blog.map_or(CommentMutation::BlogNotFound, CommentMutation::Applied))
    }
}
