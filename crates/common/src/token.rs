//! Signed password-reset tokens.
//!
//! A reset token is a short-lived HS256 JWT carrying the user id and an
//! expiry. Verification failure of any kind (bad signature, expired,
//! malformed) is reported as absence rather than an error: an invalid
//! token is an expected condition, not a fault.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{AppError, AppResult};

#[derive(Debug, Serialize, Deserialize)]
struct ResetClaims {
    /// User id the token was issued for.
    sub: String,
    /// Expiry as a unix timestamp.
    exp: u64,
}

/// Generate a signed password-reset token for `user_id`, valid for
/// `ttl_secs` seconds.
pub fn generate_reset_token(secret: &str, user_id: &str, ttl_secs: u64) -> AppResult<String> {
    let now = u64::try_from(Utc::now().timestamp())
        .map_err(|_| AppError::Internal("System clock before unix epoch".to_string()))?;

    let claims = ResetClaims {
        sub: user_id.to_string(),
        exp: now + ttl_secs,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to sign reset token: {e}")))
}

/// Verify a password-reset token and return the user id it was issued for.
///
/// Returns `None` for any invalid token: tampered signature, elapsed
/// expiry, or garbage input.
#[must_use]
pub fn verify_reset_token(secret: &str, token: &str) -> Option<String> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    decode::<ResetClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .ok()
    .map(|data| data.claims.sub)
}
