//! API layer
//!
//! HTTP handlers for:
//! - Auth (signup, login, federated, username claim)
//! - Users & social graph
//! - Posts, comments, likes, shares
//! - Notifications
//! - Metrics (Prometheus)

mod auth;
mod dto;
mod notifications;
mod posts;
mod users;

pub use dto::*;

use axum::{
    routing::{delete, get, patch, post},
    Router,
};

use crate::AppState;

/// Create the versioned API router
///
/// Authentication is enforced by the `CurrentUser` extractor in handlers;
/// only the auth entry points are reachable without a session.
pub fn api_router() -> Router<AppState> {
    // Public endpoints (no authentication required)
    let public_routes = Router::new()
        .route("/v1/auth/signup", post(auth::signup))
        .route("/v1/auth/login", post(auth::login))
        .route("/v1/auth/federated", post(auth::federated_login));

    // Authenticated endpoints (require valid token)
    let authenticated_routes = Router::new()
        // Username claim flow
        .route("/v1/auth/username_status", get(auth::username_status))
        .route("/v1/auth/username", post(auth::claim_username))
        // Users & profiles
        .route("/v1/users/me", get(users::get_me))
        .route("/v1/users/me", patch(users::update_me))
        .route("/v1/users/me/photo", post(users::upload_photo))
        .route("/v1/users/search", get(users::search_users))
        .route("/v1/users/:id", get(users::get_user))
        // Social graph
        .route("/v1/users/:id/follow", post(users::toggle_follow))
        .route("/v1/users/:id/relationship", get(users::get_relationship))
        .route("/v1/users/:id/followers", get(users::get_followers))
        .route("/v1/users/:id/following", get(users::get_following))
        .route("/v1/users/:id/posts", get(posts::get_user_posts))
        // Posts
        .route("/v1/posts", post(posts::create_post))
        .route("/v1/posts", get(posts::get_feed))
        .route("/v1/posts/:id", get(posts::get_post))
        .route("/v1/posts/:id/like", post(posts::toggle_like))
        .route("/v1/posts/:id/share", post(posts::share_post))
        .route("/v1/posts/:id/comments", get(posts::get_comments))
        .route("/v1/posts/:id/comments", post(posts::add_comment))
        .route(
            "/v1/posts/:id/comments/:comment_id",
            delete(posts::delete_comment),
        )
        // Notifications
        .route("/v1/notifications", get(notifications::get_notifications))
        .route(
            "/v1/notifications/:id/seen",
            post(notifications::mark_seen),
        )
        .route(
            "/v1/notifications/seen_all",
            post(notifications::mark_all_seen),
        )
        .route(
            "/v1/notifications/unseen_count",
            get(notifications::get_unseen_count),
        );

    public_routes.merge(authenticated_routes)
}

/// Create the metrics router (unversioned, no auth)
pub fn metrics_router() -> Router<AppState> {
    Router::new().route("/metrics", get(serve_metrics))
}

async fn serve_metrics() -> String {
    crate::metrics::gather()
}
