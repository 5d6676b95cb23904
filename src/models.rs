use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

/// Role string carried by administrators.
pub const ADMIN_ROLE: &str = "admin";

// --- Stored Documents ---

/// User
///
/// Identity record from the `users` table. Resolved during authentication and
/// embedded into comments when their author reference is populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    #[serde(rename = "_id", alias = "id")]
    pub id: Uuid,
    pub username: String,
    pub email: String,
    // 'user' or 'admin'.
    pub role: String,
}

/// Blog
///
/// A blog post together with its embedded, ordered comments. Comments are owned
/// by the blog and are always returned with their authors populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Blog {
    #[serde(rename = "_id", alias = "id")]
    pub id: Uuid,
    pub author: String,
    pub title: String,
    pub image: String,
    pub description: String,
    pub comments: Vec<Comment>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl Blog {
    pub fn comment(&self, id: Uuid) -> Option<&Comment> {
        self.comments.iter().find(|comment| comment.id == id)
    }
}

/// Comment
///
/// Embedded sub-document of a blog. `author` is `None` for comments posted
/// anonymously; such comments cannot be edited or deleted individually.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Comment {
    #[serde(rename = "_id", alias = "id")]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    pub author: Option<User>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    /// True when `user_id` is the comment's recorded author.
    pub fn is_authored_by(&self, user_id: Uuid) -> bool {
        self.author.as_ref().is_some_and(|author| author.id == user_id)
    }
}

// --- Request Payloads ---

/// CreateBlogRequest
///
/// Full blog payload for `POST /blogs`. Every field is required and non-blank.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateBlogRequest {
    pub author: String,
    pub title: String,
    pub image: String,
    pub description: String,
}

impl CreateBlogRequest {
    pub fn validate(&self) -> Result<(), String> {
        require("author", &self.author)?;
        require("title", &self.title)?;
        require("image", &self.image)?;
        require("description", &self.description)
    }
}

/// UpdateBlogRequest
///
/// Partial update for `PUT /blogs/{blog_id}`: only supplied fields are merged
/// into the stored document.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateBlogRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl UpdateBlogRequest {
    pub fn validate(&self) -> Result<(), String> {
        require_if_present("author", &self.author)?;
        require_if_present("title", &self.title)?;
        require_if_present("image", &self.image)?;
        require_if_present("description", &self.description)
    }
}

/// CreateCommentRequest
///
/// Payload for `POST /blogs/{blog_id}/comments`. Older clients send the body
/// under `comment`, which is accepted as an alias of `text`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateCommentRequest {
    pub name: String,
    pub email: String,
    #[serde(alias = "comment")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}

impl CreateCommentRequest {
    pub fn validate(&self) -> Result<(), String> {
        require("name", &self.name)?;
        require("email", &self.email)?;
        require("text", &self.text)
    }
}

/// UpdateCommentRequest
///
/// Author-only partial update. `rating` and `text` are the only mutable fields;
/// absent fields keep their stored value.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateCommentRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl UpdateCommentRequest {
    pub fn validate(&self) -> Result<(), String> {
        require_if_present("text", &self.text)
    }
}

/// NewComment
///
/// Storage-level comment insert: the validated request plus the resolved author.
#[derive(Debug, Clone, Default)]
pub struct NewComment {
    pub name: String,
    pub email: String,
    pub text: String,
    pub rating: Option<f64>,
    pub author_id: Option<Uuid>,
}

impl NewComment {
    pub fn from_request(req: CreateCommentRequest, author_id: Option<Uuid>) -> Self {
        Self {
            name: req.name,
            email: req.email,
            text: req.text,
            rating: req.rating,
            author_id,
        }
    }
}

// --- Responses ---

/// DeleteSummary
///
/// Result of a bulk delete (`DELETE /blogs`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DeleteSummary {
    pub acknowledged: bool,
    #[ts(type = "number")]
    pub deleted_count: u64,
}

impl DeleteSummary {
    pub fn deleted(count: u64) -> Self {
        Self {
            acknowledged: true,
            deleted_count: count,
        }
    }
}

fn require(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("Path `{field}` is required."));
    }
    Ok(())
}

fn require_if_present(field: &str, value: &Option<String>) -> Result<(), String> {
    match value {
        Some(value) => require(field, value),
        None => Ok(()),
    }
}
