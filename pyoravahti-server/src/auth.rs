//! Admin authentication
//!
//! Admin routes take an [`AdminAccess`] extractor. The caller must send the
//! configured token in the `x-admin-token` header; when no token is
//! configured the routes are open (development).

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::ApiError;
use crate::state::AppState;

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Proof that the request passed the admin check.
#[derive(Debug, Clone, Copy)]
pub struct AdminAccess;

/// Compare without short-circuiting on the first differing byte.
fn tokens_match(expected: &str, provided: &str) -> bool {
    let (a, b) = (expected.as_bytes(), provided.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

impl FromRequestParts<AppState> for AdminAccess {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.config.admin_token.as_deref() else {
            return Ok(AdminAccess);
        };

        let provided = parts
            .headers
            .get(ADMIN_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing x-admin-token header"))?;

        if !tokens_match(expected, provided) {
            tracing::warn!(path = %parts.uri.path(), "Rejected admin request with invalid token");
            return Err(ApiError::unauthorized("Invalid admin token"));
        }

        Ok(AdminAccess)
    }
}
