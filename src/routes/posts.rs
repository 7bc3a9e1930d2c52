use axum::extract::{Path, State};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use mongodb::bson::oid::ObjectId;
use serde_json::json;

use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::models::post::{Comment, Like, Post, PostInput};
use crate::models::user::User;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_post).get(all_posts))
        .route("/:post_id", get(post_by_id).delete(delete_post))
        .route("/like/:id", put(like_post))
        .route("/unlike/:id", put(unlike_post))
        .route("/comment/:post_id", post(add_comment))
        .route("/comment/:post_id/:comment_id", delete(remove_comment))
}

fn parse_post_id(raw: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(raw).map_err(|_| AppError::NotFound("Post not found"))
}

/// The auth gate only proves the id; name/avatar for denormalization still
/// live on the account record.
async fn load_author(state: &AppState, auth: &AuthUser) -> Result<User, AppError> {
    state
        .users
        .by_id(&auth.id)
        .await?
        .ok_or(AppError::NotFound("User not found"))
}

/// POST /api/posts
async fn create_post(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<PostInput>,
) -> Result<Json<Post>, AppError> {
    let text = payload.validate()?.to_owned();
    let author = load_author(&state, &auth).await?;
    let post = state.posts.create(Post::new(auth.id, &author, text)).await?;
    Ok(Json(post))
}

/// GET /api/posts — newest first.
async fn all_posts(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<Json<Vec<Post>>, AppError> {
    Ok(Json(state.posts.all().await?))
}

/// GET /api/posts/:post_id
async fn post_by_id(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(post_id): Path<String>,
) -> Result<Json<Post>, AppError> {
    let id = parse_post_id(&post_id)?;
    Ok(Json(state.posts.by_id(&id).await?))
}

/// DELETE /api/posts/:post_id — author only.
async fn delete_post(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(post_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let id = parse_post_id(&post_id)?;
    state.posts.delete(&id, &auth.id).await?;
    Ok(Json(json!({ "msg": "Post Deleted" })))
}

/// PUT /api/posts/like/:id
async fn like_post(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<Like>>, AppError> {
    let id = parse_post_id(&id)?;
    Ok(Json(state.posts.like(&id, &auth.id).await?))
}

/// PUT /api/posts/unlike/:id
async fn unlike_post(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<Like>>, AppError> {
    let id = parse_post_id(&id)?;
    Ok(Json(state.posts.unlike(&id, &auth.id).await?))
}

/// POST /api/posts/comment/:post_id
async fn add_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(post_id): Path<String>,
    Json(payload): Json<PostInput>,
) -> Result<Json<Vec<Comment>>, AppError> {
    let text = payload.validate()?.to_owned();
    let id = parse_post_id(&post_id)?;
    let author = load_author(&state, &auth).await?;
    let comments = state
        .posts
        .add_comment(&id, Comment::new(auth.id, &author, text))
        .await?;
    Ok(Json(comments))
}

/// DELETE /api/posts/comment/:post_id/:comment_id — comment owner only.
async fn remove_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((post_id, comment_id)): Path<(String, String)>,
) -> Result<Json<Vec<Comment>>, AppError> {
    let id = parse_post_id(&post_id)?;
    let comment = ObjectId::parse_str(&comment_id)
        .map_err(|_| AppError::NotFound("Comment does not exist"))?;
    let comments = state.posts.remove_comment(&id, &comment, &auth.id).await?;
    Ok(Json(comments))
}
