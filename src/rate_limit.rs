//! Rate limiting for credential endpoints.
//!
//! Uses a token bucket algorithm with per-IP tracking to slow down password
//! guessing and signup spam.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::{num::NonZeroU32, sync::Arc};
use tracing::warn;

use crate::auth::client_ip;

/// Per-IP rate limiter.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Fallback when a configured limit is zero.
const MIN_PER_MINUTE: NonZeroU32 = NonZeroU32::MIN;

/// Rate limiting configuration for the login and register endpoints.
#[derive(Clone)]
pub struct RateLimitConfig {
    /// Per-IP limiter for login attempts
    pub login: Arc<IpLimiter>,
    /// Per-IP limiter for account creation
    pub register: Arc<IpLimiter>,
}

impl RateLimitConfig {
    /// Create limiters allowing `login_per_minute` logins and
    /// `register_per_minute` registrations per client IP.
    pub fn new(login_per_minute: u32, register_per_minute: u32) -> Self {
        let login = NonZeroU32::new(login_per_minute).unwrap_or(MIN_PER_MINUTE);
        let register = NonZeroU32::new(register_per_minute).unwrap_or(MIN_PER_MINUTE);

        Self {
            login: Arc::new(RateLimiter::keyed(Quota::per_minute(login))),
            register: Arc::new(RateLimiter::keyed(Quota::per_minute(register))),
        }
    }
}

fn check(limiter: &IpLimiter, request: &Request, message: &'static str) -> Result<(), Response> {
    let ip = client_ip(request.extensions());
    limiter.check_key(&ip).map_err(|_| {
        warn!(client_ip = %ip, path = %request.uri().path(), "Rate limit exceeded");
        (StatusCode::TOO_MANY_REQUESTS, message).into_response()
    })
}

/// Middleware for rate limiting login attempts.
pub async fn rate_limit_login(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    match check(
        &config.login,
        &request,
        "Too many login attempts. Please wait before trying again.",
    ) {
        Ok(()) => next.run(request).await,
        Err(response) => response,
    }
}

/// Middleware for rate limiting user registration.
pub async fn rate_limit_register(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    match check(
        &config.register,
        &request,
        "Too many signup attempts. Please wait before trying again.",
    ) {
        Ok(()) => next.run(request).await,
        Err(response) => response,
    }
}
