//! Bearer credential extraction.
//!
//! Handlers that take an [`AuthenticatedOwner`] never run for a request
//! without a valid credential. The resolved owner is the only owner the
//! task store is ever given.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use tracing::debug;

use crate::domain::OwnerId;

use super::error::ApiErrorResponse;
use super::handlers::AppState;

/// The owner resolved from the request's bearer credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedOwner(pub OwnerId);

/// Extracts the token from an `Authorization: Bearer <token>` value.
///
/// The scheme is matched case-insensitively. Returns `None` for any other
/// scheme or an empty token.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

impl FromRequestParts<AppState> for AuthenticatedOwner {
    type Rejection = ApiErrorResponse;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let owner = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .and_then(|token| state.credentials.verify(token));

        match owner {
            Some(owner) => Ok(Self(owner)),
            None => {
                debug!(path = %parts.uri.path(), "Rejected request without valid credentials");
                Err(ApiErrorResponse::unauthorized())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Bearer abc", Some("abc"))]
    #[case("bearer abc", Some("abc"))]
    #[case("  Bearer   abc  ", Some("abc"))]
    #[case("Bearer ", None)]
    #[case("Bearer", None)]
    #[case("Basic abc", None)]
    #[case("abc", None)]
    #[case("", None)]
    fn test_bearer_token(#[case] header: &str, #[case] expected: Option<&str>) {
        assert_eq!(bearer_token(header), expected);
    }
}
