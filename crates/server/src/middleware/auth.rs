//! Token authentication extractor.
//!
//! Tokens are issued elsewhere; this side only resolves
//! `Authorization: Token <key>` to an active user.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};

use crate::db::UserRepository;
use crate::error::{AppError, set_sentry_user};
use crate::models::User;
use crate::state::AppState;

/// Authorization scheme accepted in the `Authorization` header.
const TOKEN_SCHEME: &str = "Token";

/// Extractor that requires an authenticated, active user.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireUser(user): RequireUser) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
pub struct RequireUser(pub User);

/// Pull the key out of `Authorization: Token <key>`.
fn token_from_headers(headers: &HeaderMap) -> Result<&str, AppError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| {
            AppError::Unauthorized("authentication credentials were not provided".to_owned())
        })?
        .to_str()
        .map_err(|_| AppError::Unauthorized("invalid authorization header".to_owned()))?;

    let (scheme, key) = value
        .trim()
        .split_once(' ')
        .ok_or_else(|| AppError::Unauthorized("invalid authorization header".to_owned()))?;

    let key = key.trim();
    if !scheme.eq_ignore_ascii_case(TOKEN_SCHEME) || key.is_empty() || key.contains(' ') {
        return Err(AppError::Unauthorized("invalid authorization header".to_owned()));
    }
    Ok(key)
}

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let key = token_from_headers(&parts.headers)?;

        let user = UserRepository::new(state.pool())
            .get_by_token(key)
            .await?
            .ok_or_else(|| AppError::Unauthorized("invalid token".to_owned()))?;

        if !user.is_active {
            return Err(AppError::Unauthorized("user inactive or deleted".to_owned()));
        }

        tracing::Span::current().record("user_id", user.id.as_i32());
        set_sentry_user(&user.id, Some(user.email.as_str()));

        Ok(Self(user))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_token_scheme_parsed() {
        assert_eq!(
            token_from_headers(&headers("Token 9944b09199c62bcf9418ad846dd0e4bb")).unwrap(),
            "9944b09199c62bcf9418ad846dd0e4bb"
        );
        assert_eq!(token_from_headers(&headers("token  abc ")).unwrap(), "abc");
    }

    #[test]
    fn test_missing_or_malformed_header_rejected() {
        assert!(matches!(
            token_from_headers(&HeaderMap::new()),
            Err(AppError::Unauthorized(_))
        ));
        assert!(token_from_headers(&headers("Token")).is_err());
        assert!(token_from_headers(&headers("Basic dXNlcjpwYXNz")).is_err());
        assert!(token_from_headers(&headers("Token a b")).is_err());
    }
}
