//! Follow graph endpoints.

use axum::{
    Router,
    extract::{Path, State},
    routing::post,
};
use chirp_common::AppResult;
use serde::Serialize;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Result of a follow or unfollow action.
#[derive(Serialize)]
pub struct FollowResponse {
    pub username: String,
    pub following: bool,
}

/// Follow a user by username.
async fn follow(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<ApiResponse<FollowResponse>> {
    let target = state.user_service.get_by_username(&username).await?;

    state.follow_service.follow(&user.id, &target.id).await?;

    Ok(ApiResponse::ok(FollowResponse {
        username: target.username,
        following: true,
    }))
}

/// Unfollow a user by username.
async fn unfollow(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<ApiResponse<FollowResponse>> {
    let target = state.user_service.get_by_username(&username).await?;

    state.follow_service.unfollow(&user.id, &target.id).await?;

    Ok(ApiResponse::ok(FollowResponse {
        username: target.username,
        following: false,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/follow/{username}", post(follow))
        .route("/unfollow/{username}", post(unfollow))
}
