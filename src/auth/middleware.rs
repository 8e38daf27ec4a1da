//! Route-layer authorization hooks.
//!
//! Install with `axum::middleware::from_fn_with_state(tokens, require_auth)`
//! on any subset of routes. Handlers behind them read the identity with
//! `Extension<RequestIdentity>` (or `Option<Extension<..>>` for the optional
//! gate).

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use super::bearer::authenticate;
use super::errors::ApiAuthError;
use crate::jwt::TokenManager;

/// Reject the request with 401 unless it carries a valid access token.
pub async fn require_auth(
    State(tokens): State<Arc<TokenManager>>,
    mut request: Request,
    next: Next,
) -> Response {
    match authenticate(request.headers(), &tokens) {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(failure) => {
            debug!(reason = failure.as_str(), path = %request.uri().path(), "Request rejected");
            ApiAuthError::from(failure).into_response()
        }
    }
}

/// Attach the identity when the request carries a valid access token.
/// Never blocks the request.
pub async fn optional_auth(
    State(tokens): State<Arc<TokenManager>>,
    mut request: Request,
    next: Next,
) -> Response {
    match authenticate(request.headers(), &tokens) {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
        }
        Err(failure) => {
            debug!(reason = failure.as_str(), "Proceeding without identity");
        }
    }
    next.run(request).await
}
