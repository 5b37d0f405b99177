//! Database repositories.

pub mod follow;
pub mod post;
pub mod user;

pub use follow::FollowRepository;
pub use post::PostRepository;
pub use user::UserRepository;
