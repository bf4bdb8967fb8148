//! Authentication endpoints

use axum::{extract::State, response::Json};
use serde::Deserialize;

use crate::api::dto::{AccountResponse, SessionResponse};
use crate::auth::{create_session_token, CurrentUser, Session};
use crate::data::User;
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub first_name: String,
    pub surname: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct FederatedLoginRequest {
    pub provider: String,
    pub subject: String,
    pub email: String,
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub struct UsernameRequest {
    pub username: String,
}

fn issue_session(state: &AppState, user: &User) -> Result<Json<SessionResponse>, AppError> {
    let session = Session::for_user(&user.id, &user.email, state.config.auth.session_max_age);
    let token = create_session_token(&session, &state.config.auth.session_secret)?;

    Ok(Json(SessionResponse {
        token,
        user: AccountResponse::from_user(user),
    }))
}

/// POST /api/v1/auth/signup
pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let user = state
        .accounts
        .signup(
            &request.first_name,
            &request.surname,
            &request.email,
            &request.password,
            &request.phone,
        )
        .await?;

    issue_session(&state, &user)
}

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let user = state
        .accounts
        .login(&request.email, &request.password)
        .await?;

    issue_session(&state, &user)
}

/// POST /api/v1/auth/federated
///
/// Accepts a federated identity assertion already verified upstream and
/// signs the mapped user in, creating them on first sight.
pub async fn federated_login(
    State(state): State<AppState>,
    Json(request): Json<FederatedLoginRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let user = state
        .accounts
        .federated_login(
            &request.provider,
            &request.subject,
            &request.email,
            &request.display_name,
        )
        .await?;

    issue_session(&state, &user)
}

/// GET /api/v1/auth/username_status
///
/// Whether the authenticated user has claimed a username yet.
pub async fn username_status(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let claimed = state.accounts.has_username(&session.user_id).await?;

    Ok(Json(serde_json::json!({ "claimed": claimed })))
}

/// POST /api/v1/auth/username
///
/// Claim a username after signup.
pub async fn claim_username(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Json(request): Json<UsernameRequest>,
) -> Result<Json<AccountResponse>, AppError> {
    let user = state
        .accounts
        .claim_username(&session.user_id, &request.username)
        .await?;

    Ok(Json(AccountResponse::from_user(&user)))
}
