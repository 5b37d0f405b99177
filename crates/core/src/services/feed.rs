//! Feed service.
//!
//! Feeds are paginated newest-first. A page is fetched with one extra
//! row beyond `per_page`; the extra row only signals that a next page
//! exists and is not returned.

use chirp_common::AppResult;
use chirp_db::{
    entities::post,
    repositories::{FollowRepository, PostRepository},
};
use serde::Serialize;

/// One page of a feed.
#[derive(Debug, Clone, Serialize)]
pub struct FeedPage<T> {
    /// Items on this page, newest first.
    pub items: Vec<T>,
    /// 1-based page number.
    pub page: u64,
    /// Whether a later page exists.
    pub has_next: bool,
    /// Whether an earlier page exists.
    pub has_prev: bool,
}

/// Feed service for business logic.
#[derive(Clone)]
pub struct FeedService {
    post_repo: PostRepository,
    follow_repo: FollowRepository,
}

impl FeedService {
    /// Create a new feed service.
    #[must_use]
    pub const fn new(post_repo: PostRepository, follow_repo: FollowRepository) -> Self {
        Self {
            post_repo,
            follow_repo,
        }
    }

    /// Posts by the user and everyone they follow.
    pub async fn personal_feed(
        &self,
        user_id: &str,
        page: u64,
        per_page: u64,
    ) -> AppResult<FeedPage<post::Model>> {
        let mut author_ids = self.follow_repo.find_followee_ids(user_id).await?;
        author_ids.push(user_id.to_string());

        let (limit, offset, page) = page_window(page, per_page);
        let rows = self.post_repo.find_by_users(&author_ids, limit, offset).await?;

        Ok(into_page(rows, page, per_page))
    }

    /// Posts from every user.
    pub async fn explore_feed(&self, page: u64, per_page: u64) -> AppResult<FeedPage<post::Model>> {
        let (limit, offset, page) = page_window(page, per_page);
        let rows = self.post_repo.find_all(limit, offset).await?;

        Ok(into_page(rows, page, per_page))
    }

    /// Posts authored by a single user.
    pub async fn user_posts(
        &self,
        user_id: &str,
        page: u64,
        per_page: u64,
    ) -> AppResult<FeedPage<post::Model>> {
        let (limit, offset, page) = page_window(page, per_page);
        let rows = self.post_repo.find_by_user(user_id, limit, offset).await?;

        Ok(into_page(rows, page, per_page))
    }
}

/// Compute the query window for a 1-based page. Page 0 is treated as
/// page 1. The limit includes one sentinel row past the page.
///
/// The page number is caller-supplied, so the offset saturates instead
/// of overflowing.
fn page_window(page: u64, per_page: u64) -> (u64, u64, u64) {
    let page = page.max(1);
    let offset = (page - 1).saturating_mul(per_page);
    (per_page.saturating_add(1), offset, page)
}

/// Turn fetched rows into a page, consuming the sentinel row if present.
fn into_page<T>(mut rows: Vec<T>, page: u64, per_page: u64) -> FeedPage<T> {
    let has_next = rows.len() as u64 > per_page;
    if has_next {
        rows.truncate(usize::try_from(per_page).unwrap_or(usize::MAX));
    }

    FeedPage {
        items: rows,
        page,
        has_next,
        has_prev: page > 1,
    }
}
