//! User and social-graph endpoints

use axum::{
    extract::{Multipart, Path, Query, State},
    response::Json,
};
use serde::Deserialize;

use crate::api::dto::{AccountResponse, RelationshipResponse, UserListEntry, UserResponse};
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::AppState;

/// Pagination parameters
#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    pub max_id: Option<String>,
    pub limit: Option<usize>,
}

/// Default and ceiling for page sizes
pub fn page_limit(requested: Option<usize>) -> usize {
    requested.unwrap_or(20).min(40)
}

/// Update profile request
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub first_name: String,
    pub surname: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub phone: String,
    pub username: String,
}

/// Search query parameters
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
    pub limit: Option<usize>,
}

/// GET /api/v1/users/me
pub async fn get_me(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<AccountResponse>, AppError> {
    let user = state.accounts.get_user(&session.user_id).await?;

    Ok(Json(AccountResponse::from_user(&user)))
}

/// GET /api/v1/users/:id
pub async fn get_user(
    State(state): State<AppState>,
    CurrentUser(_session): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state.accounts.get_user(&id).await?;

    Ok(Json(UserResponse::from_user(&user)))
}

/// PATCH /api/v1/users/me
pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<AccountResponse>, AppError> {
    let user = state
        .accounts
        .update_profile(
            &session.user_id,
            &request.first_name,
            &request.surname,
            &request.bio,
            &request.phone,
            &request.username,
        )
        .await?;

    Ok(Json(AccountResponse::from_user(&user)))
}

/// POST /api/v1/users/me/photo
///
/// Multipart upload; the `file` part carries the image.
pub async fn upload_photo(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut image: Option<(Vec<u8>, String)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {}", e)))?
    {
        if field.name() == Some("file") {
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
    }

    let (data, content_type) =
        image.ok_or_else(|| AppError::Validation("missing file field".to_string()))?;

    let photo_url = state
        .accounts
        .update_photo(&session.user_id, data, &content_type)
        .await?;

    Ok(Json(serde_json::json!({ "photo_url": photo_url })))
}

/// GET /api/v1/users/search?q=
pub async fn search_users(
    State(state): State<AppState>,
    CurrentUser(_session): CurrentUser,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let limit = page_limit(params.limit);
    let users = state.accounts.search(&params.q, limit).await?;

    Ok(Json(users.iter().map(UserResponse::from_user).collect()))
}

/// POST /api/v1/users/:id/follow
///
/// Toggle: follows when no edge exists, unfollows when one does.
pub async fn toggle_follow(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<RelationshipResponse>, AppError> {
    let relationship = state.graph.toggle_follow(&session.user_id, &id).await?;

    Ok(Json(RelationshipResponse::from_relationship(&relationship)))
}

/// GET /api/v1/users/:id/relationship
pub async fn get_relationship(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<RelationshipResponse>, AppError> {
    let relationship = state.graph.relationship(&session.user_id, &id).await?;

    Ok(Json(RelationshipResponse::from_relationship(&relationship)))
}

/// GET /api/v1/users/:id/followers
pub async fn get_followers(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Vec<UserListEntry>>, AppError> {
    // 404 for unknown users rather than an empty list
    state.accounts.get_user(&id).await?;

    let limit = page_limit(params.limit);
    let entries = state.graph.followers(&id, &session.user_id, limit).await?;

    Ok(Json(
        entries
            .iter()
            .map(|(user, followed)| UserListEntry {
                user: UserResponse::from_user(user),
                followed_by_viewer: *followed,
            })
            .collect(),
    ))
}

/// GET /api/v1/users/:id/following
pub async fn get_following(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Vec<UserListEntry>>, AppError> {
    state.accounts.get_user(&id).await?;

    let limit = page_limit(params.limit);
    let entries = state.graph.following(&id, &session.user_id, limit).await?;

    Ok(Json(
        entries
            .iter()
            .map(|(user, followed)| UserListEntry {
                user: UserResponse::from_user(user),
                followed_by_viewer: *followed,
            })
            .collect(),
    ))
}
