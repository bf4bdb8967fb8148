//! Post, comment, like, and share endpoints

use axum::{
    extract::{Multipart, Path, Query, State},
    response::Json,
};
use serde::Deserialize;

use super::users::{page_limit, PaginationParams};
use crate::api::dto::{CommentResponse, PostResponse};
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub text: String,
}

/// POST /api/v1/posts
///
/// Multipart form: `text` and `caption` text fields, optional `image` part.
pub async fn create_post(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    mut multipart: Multipart,
) -> Result<Json<PostResponse>, AppError> {
    let mut text = String::new();
    let mut caption = String::new();
    let mut image: Option<(Vec<u8>, String)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {}", e)))?
    {
        match field.name() {
            Some("text") => {
                text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("invalid text field: {}", e)))?;
            }
            Some("caption") => {
                caption = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("invalid caption field: {}", e)))?;
            }
            Some("image") => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("failed to read upload: {}", e)))?;
                image = Some((data.to_vec(), content_type));
            }
            _ => {}
        }
    }

    let post = state
        .feed
        .create_post(&session.user_id, &text, &caption, image)
        .await?;
    let author = state.accounts.get_user(&session.user_id).await?;

    Ok(Json(PostResponse::from_new_post(&post, &author)))
}

/// GET /api/v1/posts
///
/// Global feed, newest first.
pub async fn get_feed(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Vec<PostResponse>>, AppError> {
    let limit = page_limit(params.limit);
    let items = state
        .feed
        .global_feed(&session.user_id, limit, params.max_id.as_deref())
        .await?;

    Ok(Json(items.iter().map(PostResponse::from_feed_item).collect()))
}

/// GET /api/v1/posts/:id
pub async fn get_post(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<PostResponse>, AppError> {
    let item = state.feed.get_post(&id, &session.user_id).await?;

    Ok(Json(PostResponse::from_feed_item(&item)))
}

/// GET /api/v1/users/:id/posts
pub async fn get_user_posts(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Vec<PostResponse>>, AppError> {
    state.accounts.get_user(&id).await?;

    let limit = page_limit(params.limit);
    let items = state
        .feed
        .user_feed(&id, &session.user_id, limit, params.max_id.as_deref())
        .await?;

    Ok(Json(items.iter().map(PostResponse::from_feed_item).collect()))
}

/// POST /api/v1/posts/:id/like
///
/// Toggle the caller's like.
pub async fn toggle_like(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (liked, likes) = state.feed.toggle_like(&id, &session.user_id).await?;

    Ok(Json(serde_json::json!({
        "liked": liked,
        "likes": likes,
    })))
}

/// POST /api/v1/posts/:id/share
pub async fn share_post(
    State(state): State<AppState>,
    CurrentUser(_session): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let shares = state.feed.share(&id).await?;

    Ok(Json(serde_json::json!({ "shares": shares })))
}

/// GET /api/v1/posts/:id/comments
///
/// Oldest first, the order a comment thread reads in.
pub async fn get_comments(
    State(state): State<AppState>,
    CurrentUser(_session): CurrentUser,
    Path(id): Path<String>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Vec<CommentResponse>>, AppError> {
    let limit = params.limit.unwrap_or(100).min(200);
    let comments = state.feed.comments(&id, limit).await?;

    Ok(Json(
        comments
            .iter()
            .map(|(comment, author)| CommentResponse::from_comment(comment, author.as_ref()))
            .collect(),
    ))
}

/// POST /api/v1/posts/:id/comments
pub async fn add_comment(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<CommentRequest>,
) -> Result<Json<CommentResponse>, AppError> {
    let comment = state
        .feed
        .add_comment(&id, &session.user_id, &request.text)
        .await?;
    let author = state.accounts.get_user(&session.user_id).await?;

    Ok(Json(CommentResponse::from_comment(&comment, Some(&author))))
}

/// DELETE /api/v1/posts/:id/comments/:comment_id
pub async fn delete_comment(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path((_post_id, comment_id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    state
        .feed
        .delete_comment(&comment_id, &session.user_id)
        .await?;

    Ok(Json(serde_json::json!({})))
}
