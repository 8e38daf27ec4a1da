//! Axum extractors for authentication.

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::debug;

use super::bearer::{AuthFailure, authenticate};
use super::errors::ApiAuthError;
use super::state::HasTokenManager;
use super::types::RequestIdentity;

/// Resolve the identity for a request, reusing one already attached by the
/// `require_auth`/`optional_auth` middleware when present.
fn identity_for<S>(parts: &Parts, state: &S) -> Result<RequestIdentity, AuthFailure>
where
    S: HasTokenManager,
{
    if let Some(identity) = parts.extensions.get::<RequestIdentity>() {
        return Ok(identity.clone());
    }

    authenticate(&parts.headers, state.tokens()).inspect_err(|failure| {
        debug!(reason = failure.as_str(), path = %parts.uri.path(), "Authentication failed");
    })
}

/// Extractor for endpoints that require a valid access token.
/// Rejects with a generic 401 on any failure.
pub struct RequireAuth(pub RequestIdentity);

impl<S> FromRequestParts<S> for RequireAuth
where
    S: HasTokenManager + Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        identity_for(parts, state)
            .map(RequireAuth)
            .map_err(ApiAuthError::from)
    }
}

/// Optional authentication extractor - never fails.
/// Holds the identity only when the request carried a valid access token.
pub struct OptionalAuth(pub Option<RequestIdentity>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: HasTokenManager + Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalAuth(identity_for(parts, state).ok()))
    }
}
