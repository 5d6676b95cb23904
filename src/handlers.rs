use crate::{
    AppState,
    auth::{AdminUser, AuthUser},
    error::AppError,
    models::{
        Blog, Comment, CreateBlogRequest, CreateCommentRequest, DeleteSummary, NewComment,
        UpdateBlogRequest, UpdateCommentRequest,
    },
    repository::CommentMutation,
};
use axum::{
    Json,
    extract::{OriginalUri, Path, State},
    http::{Method, StatusCode},
};
use uuid::Uuid;

// --- Blog Collection: /blogs ---

/// list_blogs
///
/// [Public Route] Every blog, in insertion order, with comment authors populated.
#[utoipa::path(
    get,
    path = "/blogs",
    responses((status = 200, description = "All blogs", body = [Blog]))
)]
pub async fn list_blogs(State(state): State<AppState>) -> Result<Json<Vec<Blog>>, AppError> {
    let blogs = state.repo.list_blogs().await?;
    Ok(Json(blogs))
}

/// create_blog
///
/// [Admin Route] Creates a blog. Titles are unique; a taken title yields 409.
#[utoipa::path(
    post,
    path = "/blogs",
    request_body = CreateBlogRequest,
    responses(
        (status = 200, description = "Created", body = Blog),
        (status = 403, description = "Not an admin"),
        (status = 409, description = "Duplicate title")
    )
)]
pub async fn create_blog(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    crate::json::Json(payload): crate::json::Json<CreateBlogRequest>,
) -> Result<Json<Blog>, AppError> {
    payload.validate().map_err(AppError::Validation)?;

    let blog = state.repo.create_blog(payload).await?;
    tracing::info!(blog_id = %blog.id, admin_id = %admin.id, "blog created");
    Ok(Json(blog))
}

/// delete_blogs
///
/// [Admin Route] Removes every blog (and with them every comment).
#[utoipa::path(
    delete,
    path = "/blogs",
    responses((status = 200, description = "Deletion summary", body = DeleteSummary))
)]
pub async fn delete_blogs(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
) -> Result<Json<DeleteSummary>, AppError> {
    let deleted = state.repo.delete_blogs().await?;
    tracing::info!(deleted, admin_id = %admin.id, "all blogs deleted");
    Ok(Json(DeleteSummary::deleted(deleted)))
}

// --- Single Blog: /blogs/{blog_id} ---

/// get_blog
///
/// [Public Route] One blog with comment authors populated, or 404.
#[utoipa::path(
    get,
    path = "/blogs/{blog_id}",
    params(("blog_id" = Uuid, Path, description = "Blog ID")),
    responses(
        (status = 200, description = "Found", body = Blog),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_blog(
    State(state): State<AppState>,
    Path(blog_id): Path<Uuid>,
) -> Result<Json<Blog>, AppError> {
    state
        .repo
        .get_blog(blog_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::blog_not_found(blog_id))
}

/// update_blog
///
/// [Admin Route] Merges the supplied fields into the blog.
#[utoipa::path(
    put,
    path = "/blogs/{blog_id}",
    params(("blog_id" = Uuid, Path, description = "Blog ID")),
    request_body = UpdateBlogRequest,
    responses(
        (status = 200, description = "Updated", body = Blog),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Duplicate title")
    )
)]
pub async fn update_blog(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Path(blog_id): Path<Uuid>,
    crate::json::Json(payload): crate::json::Json<UpdateBlogRequest>,
) -> Result<Json<Blog>, AppError> {
    payload.validate().map_err(AppError::Validation)?;

    state
        .repo
        .update_blog(blog_id, payload)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::blog_not_found(blog_id))
}

/// delete_blog
///
/// [Admin Route] Removes one blog. Answers with the removed document, or
/// `null` when nothing matched.
#[utoipa::path(
    delete,
    path = "/blogs/{blog_id}",
    params(("blog_id" = Uuid, Path, description = "Blog ID")),
    responses((status = 200, description = "Removed blog or null", body = Blog))
)]
pub async fn delete_blog(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(blog_id): Path<Uuid>,
) -> Result<Json<Option<Blog>>, AppError> {
    let removed = state.repo.delete_blog(blog_id).await?;
    if removed.is_some() {
        tracing::info!(%blog_id, admin_id = %admin.id, "blog deleted");
    }
    Ok(Json(removed))
}

// --- Comments Sub-collection: /blogs/{blog_id}/comments ---

/// get_comments
///
/// [Public Route] The blog's comments in insertion order.
#[utoipa::path(
    get,
    path = "/blogs/{blog_id}/comments",
    params(("blog_id" = Uuid, Path, description = "Blog ID")),
    responses(
        (status = 200, description = "Comments", body = [Comment]),
        (status = 404, description = "Blog Not Found")
    )
)]
pub async fn get_comments(
    State(state): State<AppState>,
    Path(blog_id): Path<Uuid>,
) -> Result<Json<Vec<Comment>>, AppError> {
    let blog = state
        .repo
        .get_blog(blog_id)
        .await?
        .ok_or_else(|| AppError::blog_not_found(blog_id))?;
    Ok(Json(blog.comments))
}

/// add_comment
///
/// [Public/Authenticated Route] Appends a comment and returns the updated blog.
///
/// Signed-in users become the comment's author. Anonymous comments are only
/// accepted while `public_comments` is enabled.
#[utoipa::path(
    post,
    path = "/blogs/{blog_id}/comments",
    params(("blog_id" = Uuid, Path, description = "Blog ID")),
    request_body = CreateCommentRequest,
    responses(
        (status = 200, description = "Updated blog", body = Blog),
        (status = 401, description = "Anonymous comments disabled"),
        (status = 404, description = "Blog Not Found")
    )
)]
pub async fn add_comment(
    user: Option<AuthUser>,
    State(state): State<AppState>,
    Path(blog_id): Path<Uuid>,
    payload: Result<crate::json::Json<CreateCommentRequest>, AppError>,
) -> Result<Json<Blog>, AppError> {
    if user.is_none() && !state.config.public_comments {
        return Err(AppError::Unauthorized);
    }
    let body = payload.and_then(|crate::json::Json(req)| {
        req.validate().map_err(AppError::Validation)?;
        Ok(req)
    });
    let payload = body_for_existing_blog(&state, blog_id, body).await?;

    let comment = NewComment::from_request(payload, user.map(|u| u.id));
    state
        .repo
        .add_comment(blog_id, comment)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::blog_not_found(blog_id))
}

/// delete_comments
///
/// [Admin Route] Removes every comment on the blog and returns the blog.
#[utoipa::path(
    delete,
    path = "/blogs/{blog_id}/comments",
    params(("blog_id" = Uuid, Path, description = "Blog ID")),
    responses(
        (status = 200, description = "Updated blog", body = Blog),
        (status = 404, description = "Blog Not Found")
    )
)]
pub async fn delete_comments(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(blog_id): Path<Uuid>,
) -> Result<Json<Blog>, AppError> {
    let blog = state
        .repo
        .clear_comments(blog_id)
        .await?
        .ok_or_else(|| AppError::blog_not_found(blog_id))?;
    tracing::info!(%blog_id, admin_id = %admin.id, "comments cleared");
    Ok(Json(blog))
}

// --- Single Comment: /blogs/{blog_id}/comments/{comment_id} ---

/// get_comment
///
/// [Public Route] One comment with its author populated.
#[utoipa::path(
    get,
    path = "/blogs/{blog_id}/comments/{comment_id}",
    params(
        ("blog_id" = Uuid, Path, description = "Blog ID"),
        ("comment_id" = Uuid, Path, description = "Comment ID")
    ),
    responses(
        (status = 200, description = "Comment", body = Comment),
        (status = 404, description = "Blog or Comment Not Found")
    )
)]
pub async fn get_comment(
    State(state): State<AppState>,
    Path((blog_id, comment_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Comment>, AppError> {
    let blog = state
        .repo
        .get_blog(blog_id)
        .await?
        .ok_or_else(|| AppError::blog_not_found(blog_id))?;

    blog.comment(comment_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::comment_not_found(comment_id))
}

/// update_comment
///
/// [Authenticated Route] Author-only partial update of `rating` and/or `text`.
#[utoipa::path(
    put,
    path = "/blogs/{blog_id}/comments/{comment_id}",
    params(
        ("blog_id" = Uuid, Path, description = "Blog ID"),
        ("comment_id" = Uuid, Path, description = "Comment ID")
    ),
    request_body = UpdateCommentRequest,
    responses(
        (status = 200, description = "Updated blog", body = Blog),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Blog or Comment Not Found")
    )
)]
pub async fn update_comment(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path((blog_id, comment_id)): Path<(Uuid, Uuid)>,
    payload: Result<crate::json::Json<UpdateCommentRequest>, AppError>,
) -> Result<Json<Blog>, AppError> {
    let body = payload.and_then(|crate::json::Json(req)| {
        req.validate().map_err(AppError::Validation)?;
        Ok(req)
    });
    let payload = body_for_existing_blog(&state, blog_id, body).await?;

    let outcome = state
        .repo
        .update_comment(blog_id, comment_id, user_id, payload)
        .await?;
    resolve_mutation(outcome, blog_id, comment_id)
}

/// delete_comment
///
/// [Authenticated Route] Author-only removal of a single comment.
#[utoipa::path(
    delete,
    path = "/blogs/{blog_id}/comments/{comment_id}",
    params(
        ("blog_id" = Uuid, Path, description = "Blog ID"),
        ("comment_id" = Uuid, Path, description = "Comment ID")
    ),
    responses(
        (status = 200, description = "Updated blog", body = Blog),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Blog or Comment Not Found")
    )
)]
pub async fn delete_comment(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path((blog_id, comment_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Blog>, AppError> {
    let outcome = state
        .repo
        .delete_comment(blog_id, comment_id, user_id)
        .await?;
    resolve_mutation(outcome, blog_id, comment_id)
}

/// Surfaces a body error only once the blog is known to exist, so a missing
/// blog answers 404 whatever was sent.
async fn body_for_existing_blog<T>(
    state: &AppState,
    blog_id: Uuid,
    body: Result<T, AppError>,
) -> Result<T, AppError> {
    let err = match body {
        Ok(req) => return Ok(req),
        Err(err) => err,
    };
    if state.repo.get_blog(blog_id).await?.is_none() {
        return Err(AppError::blog_not_found(blog_id));
    }
    Err(err)
}

fn resolve_mutation(
    outcome: CommentMutation,
    blog_id: Uuid,
    comment_id: Uuid,
) -> Result<Json<Blog>, AppError> {
    match outcome {
        CommentMutation::Applied(blog) => Ok(Json(blog)),
        CommentMutation::BlogNotFound => Err(AppError::blog_not_found(blog_id)),
        CommentMutation::CommentNotFound => Err(AppError::comment_not_found(comment_id)),
        CommentMutation::NotAuthor => Err(AppError::not_comment_author()),
    }
}

// --- Shared ---

/// unsupported
///
/// Answers methods that have no meaning on a path (PUT on collections, POST on
/// single resources) with 403 and a plain-text message naming the path.
pub async fn unsupported(method: Method, OriginalUri(uri): OriginalUri) -> AppError {
    AppError::Unsupported(format!("{method} operation not supported on {}", uri.path()))
}

/// preflight
///
/// `OPTIONS` on any blog path: 200 with an empty body. Cross-origin preflights
/// are answered earlier by the CORS layer.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}
