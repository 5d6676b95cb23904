#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use blog_api::{
    AppConfig, AppState, create_router,
    auth::Claims,
    models::{
        Blog, Comment, CreateBlogRequest, NewComment, UpdateBlogRequest, UpdateCommentRequest,
        User,
    },
    repository::{CommentMutation, Repository, RepositoryError},
};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::Value;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::SystemTime,
};
use tower::ServiceExt;
use uuid::Uuid;

pub const ADMIN_ID: Uuid = Uuid::from_u128(1);
pub const ALICE_ID: Uuid = Uuid::from_u128(2);
pub const BOB_ID: Uuid = Uuid::from_u128(3);

// --- In-Memory Repository ---

/// Repository with the same observable semantics as the Postgres one:
/// unique titles, insertion-ordered comments, author-gated comment mutations.
#[derive(Default)]
pub struct MemoryRepository {
    blogs: Mutex<Vec<Blog>>,
    users: Mutex<HashMap<Uuid, User>>,
}

impl MemoryRepository {
    /// Repository pre-seeded with one admin and two regular users.
    pub fn seeded() -> Self {
        let repo = Self::default();
        repo.insert_user(user(ADMIN_ID, "admin", "admin"));
        repo.insert_user(user(ALICE_ID, "alice", "user"));
        repo.insert_user(user(BOB_ID, "bob", "user"));
        repo
    }

    pub fn insert_user(&self, user: User) {
        self.users.lock().unwrap().insert(user.id, user);
    }

    pub fn snapshot(&self, id: Uuid) -> Option<Blog> {
        self.blogs.lock().unwrap().iter().find(|b| b.id == id).cloned()
    }

    fn with_blog<R>(&self, id: Uuid, f: impl FnOnce(&mut Blog) -> R) -> Option<R> {
        let mut blogs = self.blogs.lock().unwrap();
        blogs.iter_mut().find(|b| b.id == id).map(f)
    }
}

pub fn user(id: Uuid, username: &str, role: &str) -> User {
    User {
        id,
        username: username.to_string(),
        email: format!("{username}@example.com"),
        role: role.to_string(),
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }

    async fn list_blogs(&self) -> Result<Vec<Blog>, RepositoryError> {
        Ok(self.blogs.lock().unwrap().clone())
    }

    async fn get_blog(&self, id: Uuid) -> Result<Option<Blog>, RepositoryError> {
        Ok(self.snapshot(id))
    }

    async fn create_blog(&self, req: CreateBlogRequest) -> Result<Blog, RepositoryError> {
        let mut blogs = self.blogs.lock().unwrap();
        if blogs.iter().any(|b| b.title == req.title) {
            return Err(RepositoryError::DuplicateTitle(req.title));
        }
        let now = Utc::now();
        let blog = Blog {
            id: Uuid::new_v4(),
            author: req.author,
            title: req.title,
            image: req.image,
            description: req.description,
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        blogs.push(blog.clone());
        Ok(blog)
    }

    async fn update_blog(
        &self,
        id: Uuid,
        req: UpdateBlogRequest,
    ) -> Result<Option<Blog>, RepositoryError> {
        let mut blogs = self.blogs.lock().unwrap();
        if let Some(title) = &req.title {
            if blogs.iter().any(|b| b.id != id && &b.title == title) {
                return Err(RepositoryError::DuplicateTitle(title.clone()));
            }
        }
        let Some(blog) = blogs.iter_mut().find(|b| b.id == id) else {
            return Ok(None);
        };
        if let Some(author) = req.author {
            blog.author = author;
        }
        if let Some(title) = req.title {
            blog.title = title;
        }
        if let Some(image) = req.image {
            blog.image = image;
        }
        if let Some(description) = req.description {
            blog.description = description;
        }
        blog.updated_at = Utc::now();
        Ok(Some(blog.clone()))
    }

    async fn delete_blogs(&self) -> Result<u64, RepositoryError> {
        let mut blogs = self.blogs.lock().unwrap();
        let count = blogs.len() as u64;
        blogs.clear();
        Ok(count)
    }

    async fn delete_blog(&self, id: Uuid) -> Result<Option<Blog>, RepositoryError> {
        let mut blogs = self.blogs.lock().unwrap();
        let position = blogs.iter().position(|b| b.id == id);
        Ok(position.map(|index| blogs.remove(index)))
    }

    async fn add_comment(
        &self,
        blog_id: Uuid,
        comment: NewComment,
    ) -> Result<Option<Blog>, RepositoryError> {
        let author = comment
            .author_id
            .and_then(|id| self.users.lock().unwrap().get(&id).cloned());
        let now = Utc::now();
        Ok(self.with_blog(blog_id, |blog| {
            blog.comments.push(Comment {
                id: Uuid::new_v4(),
                name: comment.name,
                email: comment.email,
                text: comment.text,
                rating: comment.rating,
                author,
                created_at: now,
                updated_at: now,
            });
            blog.updated_at = now;
            blog.clone()
        }))
    }

    async fn clear_comments(&self, blog_id: Uuid) -> Result<Option<Blog>, RepositoryError> {
        Ok(self.with_blog(blog_id, |blog| {
            blog.comments.clear();
            blog.updated_at = Utc::now();
            blog.clone()
        }))
    }

    async fn update_comment(
        &self,
        blog_id: Uuid,
        comment_id: Uuid,
        author_id: Uuid,
        req: UpdateCommentRequest,
    ) -> Result<CommentMutation, RepositoryError> {
        let outcome = self.with_blog(blog_id, |blog| {
            let Some(comment) = blog.comments.iter_mut().find(|c| c.id == comment_id) else {
                return CommentMutation::CommentNotFound;
            };
            if !comment.is_authored_by(author_id) {
                return CommentMutation::NotAuthor;
            }
            if let Some(rating) = req.rating {
                comment.rating = Some(rating);
            }
            if let Some(text) = req.text {
                comment.text = text;
            }
            comment.updated_at = Utc::now();
            blog.updated_at = comment.updated_at;
            CommentMutation::Applied(blog.clone())
        });
        Ok(outcome.unwrap_or(CommentMutation::BlogNotFound))
    }

    async fn delete_comment(
        &self,
        blog_id: Uuid,
        comment_id: Uuid,
        author_id: Uuid,
    ) -> Result<CommentMutation, RepositoryError> {
        let outcome = self.with_blog(blog_id, |blog| {
            let Some(index) = blog.comments.iter().position(|c| c.id == comment_id) else {
                return CommentMutation::CommentNotFound;
            };
            if !blog.comments[index].is_authored_by(author_id) {
                return CommentMutation::NotAuthor;
            }
            blog.comments.remove(index);
            blog.updated_at = Utc::now();
            CommentMutation::Applied(blog.clone())
        });
        Ok(outcome.unwrap_or(CommentMutation::BlogNotFound))
    }
}

// --- App Helpers ---

pub fn test_state(repo: Arc<MemoryRepository>, config: AppConfig) -> AppState {
    AppState { repo, config }
}

pub fn test_app(repo: Arc<MemoryRepository>) -> Router {
    create_router(test_state(repo, AppConfig::default()))
}

pub fn create_token(user_id: Uuid, secret: &str, exp_offset: i64) -> String {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;

    let claims = Claims {
        sub: user_id,
        iat: now as usize,
        exp: (now + exp_offset) as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

/// Builds a request; `as_user` uses the local `x-user-id` bypass.
pub fn request(method: Method, uri: &str, as_user: Option<Uuid>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(id) = as_user {
        builder = builder.header("x-user-id", id.to_string());
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).unwrap()
    }
}

pub async fn send(app: &Router, req: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    TestResponse {
        status,
        content_type,
        body,
    }
}

pub fn blog_payload(title: &str) -> Value {
    serde_json::json!({
        "title": title,
        "author": "x",
        "image": "i",
        "description": "d"
    })
}

/// Creates a blog as the admin and returns its id.
pub async fn create_blog(app: &Router, title: &str) -> Uuid {
    let res = send(
        app,
        request(Method::POST, "/blogs", Some(ADMIN_ID), Some(blog_payload(title))),
    )
    .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text());
    res.json()["_id"].as_str().unwrap().parse().unwrap()
}

/// Posts a comment and returns the new comment's id (last in the sequence).
pub async fn add_comment(app: &Router, blog_id: Uuid, as_user: Option<Uuid>, text: &str) -> Uuid {
    let res = send(
        app,
        request(
            Method::POST,
            &format!("/blogs/{blog_id}/comments"),
            as_user,
            Some(serde_json::json!({ "name": "n", "email": "e", "text": text })),
        ),
    )
    .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text());
    let blog = res.json();
    let comments = blog["comments"].as_array().unwrap();
    comments.last().unwrap()["_id"].as_str().unwrap().parse().unwrap()
}
