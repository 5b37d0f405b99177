//! Request extractors.
//!
//! The auth middleware resolves a Bearer token and stores the caller's
//! user in request extensions; extractors here read it back out.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};
use chirp_db::entities::user;

/// The authenticated caller.
///
/// Taking this as a handler argument makes the route require a valid
/// token: requests without one are rejected with 401.
#[derive(Debug, Clone)]
pub struct AuthUser(pub user::Model);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<user::Model>()
            .cloned()
            .map(AuthUser)
            .ok_or((StatusCode::UNAUTHORIZED, "Unauthorized"))
    }
}
