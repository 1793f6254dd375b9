//! Bearer-token authentication extractors.
//!
//! Route handlers opt into authentication by taking [`RequireAuth`] or
//! [`RequireAdmin`] as an argument. The token is verified before the user
//! is loaded, so requests with no or bad credentials never reach the
//! database.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use tracing::debug;

use bazaar_core::user::UserProfile;

use crate::db::UserRepository;
use crate::error::{AppError, set_sentry_user};
use crate::state::AppState;

const NO_TOKEN: &str = "Not authorized, no token";
const TOKEN_FAILED: &str = "Not authorized, token failed";
const NOT_ADMIN: &str = "Not authorized as an admin";

/// Extractor that requires a valid bearer token for an existing user.
///
/// # Example
///
/// ```rust,ignore
/// async fn profile(RequireAuth(user): RequireAuth) -> Json<UserProfile> {
///     Json(user)
/// }
/// ```
pub struct RequireAuth(pub UserProfile);

/// Extractor that requires an authenticated administrator.
pub struct RequireAdmin(pub UserProfile);

/// Pull the token out of an `Authorization: Bearer <token>` header.
///
/// Returns `None` when the header is missing, not valid UTF-8, uses another
/// scheme, or carries an empty token.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized(NO_TOKEN.to_string()))?;

        let claims = state.tokens().verify(token).map_err(|e| {
            debug!(error = %e, "Rejected bearer token");
            AppError::Unauthorized(TOKEN_FAILED.to_string())
        })?;

        // A valid token for a deleted account fails the same way as a bad one.
        let user = UserRepository::new(state.pool())
            .get_by_id(claims.id)
            .await?
            .ok_or_else(|| AppError::Unauthorized(TOKEN_FAILED.to_string()))?;

        set_sentry_user(&user.id, Some(user.email.as_str()));

        Ok(Self(user.into()))
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;

        if !user.is_admin {
            return Err(AppError::Unauthorized(NOT_ADMIN.to_string()));
        }

        Ok(Self(user))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_bearer_token_extracted() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(bearer_token(&headers("bearer abc")), Some("abc"));
    }

    #[test]
    fn test_missing_or_foreign_scheme() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);
        assert_eq!(bearer_token(&headers("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(&headers("Bearer")), None);
        assert_eq!(bearer_token(&headers("Bearer   ")), None);
        assert_eq!(bearer_token(&headers("abc.def.ghi")), None);
    }
}
