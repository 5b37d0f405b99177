//! Post and feed endpoints.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use chirp_common::AppResult;
use chirp_core::FeedPage;
use chirp_db::entities::post;
use serde::Deserialize;

use super::PageQuery;
use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// The personal feed: posts by the user and everyone they follow.
async fn home(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<ApiResponse<FeedPage<post::Model>>> {
    let feed = state
        .feed_service
        .personal_feed(&user.id, query.page, state.posts_per_page)
        .await?;

    Ok(ApiResponse::ok(feed))
}

/// The explore feed: posts from every user.
async fn explore(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<ApiResponse<FeedPage<post::Model>>> {
    let feed = state
        .feed_service
        .explore_feed(query.page, state.posts_per_page)
        .await?;

    Ok(ApiResponse::ok(feed))
}

/// Post creation request.
#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub body: String,
}

/// Publish a new post.
async fn create_post(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreatePostRequest>,
) -> AppResult<ApiResponse<post::Model>> {
    let input = chirp_core::services::post::CreatePostInput { body: req.body };
    let created = state.post_service.create(&user.id, input).await?;

    Ok(ApiResponse::ok(created))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/index", get(home))
        .route("/index/", get(home))
        .route("/blog", get(home).post(create_post))
        .route("/explore", get(explore))
}
