//! API middleware.

#![allow(missing_docs)]

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use chirp_core::{FeedService, FollowService, Mailer, PostService, UserService};

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub post_service: PostService,
    pub follow_service: FollowService,
    pub feed_service: FeedService,
    pub mailer: Mailer,
    /// Feed page size.
    pub posts_per_page: u64,
    /// Public URL of this instance, used in mailed links.
    pub public_url: String,
}

/// Authentication middleware.
///
/// Resolves a Bearer token to its user and stores the user in request
/// extensions. Requests without a valid token pass through
/// unauthenticated; handlers that need a user reject them.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
        && let Ok(user) = state.user_service.authenticate_by_token(token).await
    {
        // Losing a last-access update is not worth failing the request
        if let Err(e) = state.user_service.touch_last_access(&user.id).await {
            tracing::warn!(user_id = %user.id, error = %e, "Failed to update last access time");
        }
        req.extensions_mut().insert(user);
    }

    next.run(req).await
}

/// Server-error reporting middleware.
///
/// Sends a best-effort notification to the configured admin address
/// whenever a request ends in a 5xx response. The response itself is
/// never altered.
pub async fn error_report_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    if response.status().is_server_error() {
        state
            .mailer
            .send_error_report(method.as_str(), &path, response.status().as_u16());
    }

    response
}
