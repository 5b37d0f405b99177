//! HTTP API layer for chirp.
//!
//! This crate provides the JSON API:
//!
//! - **Endpoints**: auth, profiles, posts, feeds, and the follow graph
//! - **Extractors**: authentication via request extensions
//! - **Middleware**: token authentication
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
pub use middleware::AppState;
