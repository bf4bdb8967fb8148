//! Notification endpoints

use std::collections::{HashMap, HashSet};

use axum::{
    extract::{Path, Query, State},
    response::Json,
};

use super::users::{page_limit, PaginationParams};
use crate::api::dto::NotificationResponse;
use crate::auth::CurrentUser;
use crate::data::User;
use crate::error::AppError;
use crate::AppState;

/// GET /api/v1/notifications
pub async fn get_notifications(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Vec<NotificationResponse>>, AppError> {
    let limit = page_limit(params.limit);
    let notifications = state
        .db
        .get_notifications(&session.user_id, limit, params.max_id.as_deref())
        .await?;

    // Enrich with the originating users in one query
    let from_ids: Vec<String> = notifications
        .iter()
        .map(|n| n.from_user_id.clone())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let from_users: HashMap<String, User> = state
        .db
        .get_users_by_ids(&from_ids)
        .await?
        .into_iter()
        .map(|user| (user.id.clone(), user))
        .collect();

    Ok(Json(
        notifications
            .iter()
            .map(|notification| {
                NotificationResponse::from_notification(
                    notification,
                    from_users.get(&notification.from_user_id),
                )
            })
            .collect(),
    ))
}

/// POST /api/v1/notifications/:id/seen
///
/// Only the recipient may mark a notification seen.
pub async fn mark_seen(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let notification = state
        .db
        .get_notification(&id)
        .await?
        .ok_or(AppError::NotFound)?;

    if notification.to_user_id != session.user_id {
        return Err(AppError::Forbidden);
    }

    state.db.mark_notification_seen(&id).await?;

    Ok(Json(serde_json::json!({})))
}

/// POST /api/v1/notifications/seen_all
pub async fn mark_all_seen(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<serde_json::Value>, AppError> {
    state
        .db
        .mark_all_notifications_seen(&session.user_id)
        .await?;

    Ok(Json(serde_json::json!({})))
}

/// GET /api/v1/notifications/unseen_count
pub async fn get_unseen_count(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let count = state
        .db
        .count_unseen_notifications(&session.user_id)
        .await?;

    Ok(Json(serde_json::json!({ "count": count })))
}
