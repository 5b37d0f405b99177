//! Authentication endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use chirp_common::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Registration request.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Session response: the account and its access token.
#[derive(Serialize)]
pub struct SessionResponse {
    pub id: String,
    pub username: String,
    pub token: String,
}

/// Create a new user account.
async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<ApiResponse<SessionResponse>> {
    let input = chirp_core::services::user::RegisterInput {
        username: req.username,
        email: req.email,
        password: req.password,
    };

    let user = state.user_service.register(input).await?;

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");

    Ok(ApiResponse::ok(SessionResponse {
        id: user.id.clone(),
        username: user.username,
        token: user.token.unwrap_or_default(),
    }))
}

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Log in to an existing account.
async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<ApiResponse<SessionResponse>> {
    let (user, token) = state
        .user_service
        .login(&req.username, &req.password)
        .await?;

    Ok(ApiResponse::ok(SessionResponse {
        id: user.id.clone(),
        username: user.username,
        token,
    }))
}

/// Acknowledgement response.
#[derive(Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

/// Log out (invalidate the current token by regenerating it).
async fn logout(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<OkResponse>> {
    state.user_service.regenerate_token(&user.id).await?;

    Ok(ApiResponse::ok(OkResponse { ok: true }))
}

/// Password reset request.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
}

/// Request a password-reset mail.
///
/// The response is identical whether or not the address belongs to an
/// account, so addresses cannot be probed.
async fn reset_password_request(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> AppResult<ApiResponse<OkResponse>> {
    if let Some((user, token)) = state.user_service.begin_password_reset(&req.email).await? {
        state
            .mailer
            .send_password_reset(&user, &token, &state.public_url);
    }

    Ok(ApiResponse::ok(OkResponse { ok: true }))
}

/// New password for a reset.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordBody {
    pub password: String,
}

/// Complete a password reset using a mailed token.
async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(req): Json<ResetPasswordBody>,
) -> AppResult<ApiResponse<OkResponse>> {
    let user = state
        .user_service
        .reset_password(&token, &req.password)
        .await?;

    match user {
        Some(user) => {
            tracing::info!(user_id = %user.id, "Password reset completed");
            Ok(ApiResponse::ok(OkResponse { ok: true }))
        }
        None => Err(AppError::Validation(
            "Invalid or expired reset token".to_string(),
        )),
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/reset_password_request", post(reset_password_request))
        .route("/reset_password/{token}", post(reset_password))
}
