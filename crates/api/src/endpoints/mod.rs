//! API endpoints.

mod auth;
mod blog;
mod follow;
mod profile;

use axum::Router;
use serde::Deserialize;

use crate::middleware::AppState;

/// Pagination query parameters shared by the feed endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct PageQuery {
    #[serde(default = "default_page")]
    pub page: u64,
}

const fn default_page() -> u64 {
    1
}

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .merge(blog::router())
        .merge(profile::router())
        .merge(follow::router())
}
