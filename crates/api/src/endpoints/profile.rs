//! Profile endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use chirp_common::AppResult;
use chirp_core::FeedPage;
use chirp_db::entities::post;
use serde::{Deserialize, Serialize};

use super::PageQuery;
use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// A user's public profile with a page of their posts.
#[derive(Serialize)]
pub struct UserProfileResponse {
    pub id: String,
    pub username: String,
    pub about_me: Option<String>,
    pub last_access_at: Option<chrono::DateTime<chrono::FixedOffset>>,
    pub followers_count: u64,
    pub following_count: u64,
    /// Whether the viewer follows this user. Absent on a user's own
    /// profile.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_following: Option<bool>,
    pub posts: FeedPage<post::Model>,
}

/// Show a user's profile page.
async fn user_profile(
    AuthUser(viewer): AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<ApiResponse<UserProfileResponse>> {
    let user = state.user_service.get_by_username(&username).await?;

    let posts = state
        .feed_service
        .user_posts(&user.id, query.page, state.posts_per_page)
        .await?;

    let followers_count = state.follow_service.count_followers(&user.id).await?;
    let following_count = state.follow_service.count_following(&user.id).await?;

    let is_following = if viewer.id == user.id {
        None
    } else {
        Some(
            state
                .follow_service
                .is_following(&viewer.id, &user.id)
                .await?,
        )
    };

    Ok(ApiResponse::ok(UserProfileResponse {
        id: user.id,
        username: user.username,
        about_me: user.about_me,
        last_access_at: user.last_access_at,
        followers_count,
        following_count,
        is_following,
        posts,
    }))
}

/// Profile edit request.
#[derive(Debug, Deserialize)]
pub struct EditProfileRequest {
    pub username: Option<String>,
    pub about_me: Option<String>,
}

/// The caller's own profile after an edit.
#[derive(Serialize)]
pub struct OwnProfileResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub about_me: Option<String>,
}

/// Show the caller's own profile, as prefill for the edit form.
async fn own_profile(AuthUser(user): AuthUser) -> ApiResponse<OwnProfileResponse> {
    ApiResponse::ok(OwnProfileResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        about_me: user.about_me,
    })
}

/// Edit the caller's profile.
async fn edit_profile(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<EditProfileRequest>,
) -> AppResult<ApiResponse<OwnProfileResponse>> {
    let input = chirp_core::services::user::UpdateProfileInput {
        username: req.username,
        about_me: req.about_me,
    };

    let updated = state.user_service.update_profile(&user.id, input).await?;

    Ok(ApiResponse::ok(OwnProfileResponse {
        id: updated.id,
        username: updated.username,
        email: updated.email,
        about_me: updated.about_me,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/user/{username}", get(user_profile))
        .route("/edit_profile", get(own_profile).post(edit_profile))
}
