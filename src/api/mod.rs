mod auth;
mod error;
mod health;

use axum::Router;
use std::sync::Arc;

use crate::db::Database;
use crate::jwt::TokenManager;
use crate::rate_limit::RateLimitConfig;

pub use auth::AuthState;
pub use error::ApiError;

/// Create the versioned API router (mounted under `/api/v1`).
pub fn create_api_router(
    db: Database,
    tokens: Arc<TokenManager>,
    rate_limit: Arc<RateLimitConfig>,
) -> Router {
    let auth_state = auth::AuthState {
        db,
        tokens,
        rate_limit,
    };

    Router::new().nest("/auth", auth::router(auth_state))
}

/// Routes outside the versioned API: banner and health probe.
pub fn create_root_router() -> Router {
    health::router()
}
