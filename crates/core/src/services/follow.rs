//! Follow service.

use chirp_common::{AppError, AppResult, IdGenerator};
use chirp_db::{entities::follow, repositories::FollowRepository};
use sea_orm::Set;

/// Follow service for business logic.
#[derive(Clone)]
pub struct FollowService {
    follow_repo: FollowRepository,
    id_gen: IdGenerator,
}

impl FollowService {
    /// Create a new follow service.
    #[must_use]
    pub fn new(follow_repo: FollowRepository) -> Self {
        Self {
            follow_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Follow a user.
    ///
    /// Following yourself is rejected. Following a user you already
    /// follow is a no-op.
    pub async fn follow(&self, follower_id: &str, followee_id: &str) -> AppResult<()> {
        if follower_id == followee_id {
            return Err(AppError::InvalidOperation(
                "You cannot follow yourself".to_string(),
            ));
        }

        if self
            .follow_repo
            .is_following(follower_id, followee_id)
            .await?
        {
            return Ok(());
        }

        let model = follow::ActiveModel {
            id: Set(self.id_gen.generate()),
            follower_id: Set(follower_id.to_string()),
            followee_id: Set(followee_id.to_string()),
            ..Default::default()
        };

        self.follow_repo.create(model).await?;

        tracing::debug!(follower_id, followee_id, "Follow created");
        Ok(())
    }

    /// Unfollow a user.
    ///
    /// Unfollowing yourself is rejected. Unfollowing a user you do not
    /// follow is a no-op.
    pub async fn unfollow(&self, follower_id: &str, followee_id: &str) -> AppResult<()> {
        if follower_id == followee_id {
            return Err(AppError::InvalidOperation(
                "You cannot unfollow yourself".to_string(),
            ));
        }

        self.follow_repo
            .delete_by_pair(follower_id, followee_id)
            .await
    }

    /// Check whether `follower_id` is following `followee_id`.
    pub async fn is_following(&self, follower_id: &str, followee_id: &str) -> AppResult<bool> {
        self.follow_repo.is_following(follower_id, followee_id).await
    }

    /// Count followers of a user.
    pub async fn count_followers(&self, user_id: &str) -> AppResult<u64> {
        self.follow_repo.count_followers(user_id).await
    }

    /// Count users a user is following.
    pub async fn count_following(&self, user_id: &str) -> AppResult<u64> {
        self.follow_repo.count_following(user_id).await
    }
}
