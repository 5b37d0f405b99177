//! Business logic layer for chirp.

pub mod services;

pub use services::{
    FeedPage, FeedService, FollowService, Mailer, PostService, UserService,
};
