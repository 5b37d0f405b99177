//! Post service.

use chirp_common::{AppResult, IdGenerator};
use chirp_db::{
    entities::post,
    repositories::PostRepository,
};
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

/// Post service for business logic.
#[derive(Clone)]
pub struct PostService {
    post_repo: PostRepository,
    id_gen: IdGenerator,
}

/// Input for creating a post.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostInput {
    #[validate(length(min = 1, max = 140))]
    pub body: String,
}

impl PostService {
    /// Create a new post service.
    #[must_use]
    pub fn new(post_repo: PostRepository) -> Self {
        Self {
            post_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a new post authored by `user_id`.
    pub async fn create(&self, user_id: &str, input: CreatePostInput) -> AppResult<post::Model> {
        input.validate()?;

        let model = post::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            body: Set(input.body),
            ..Default::default()
        };

        let post = self.post_repo.create(model).await?;

        tracing::debug!(post_id = %post.id, user_id, "Post created");
        Ok(post)
    }
}
