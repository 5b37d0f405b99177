//! Business logic services.

pub mod feed;
pub mod follow;
pub mod mailer;
pub mod post;
pub mod user;

pub use feed::{FeedPage, FeedService};
pub use follow::FollowService;
pub use mailer::Mailer;
pub use post::PostService;
pub use user::UserService;
