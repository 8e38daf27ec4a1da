//! Account and token endpoints.
//!
//! - POST `/register` - Create an account and issue a token pair
//! - POST `/login` - Verify credentials and issue a token pair
//! - POST `/refresh` - Exchange a refresh token for a new access token
//! - GET `/profile` - Current user's stored profile (access token required)
//! - DELETE `/logout` - Acknowledge logout (access token required)
//! - GET `/session` - Report whether the request is authenticated

use axum::{
    Extension, Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::error::{ApiError, ResultExt};
use crate::auth::{OptionalAuth, RequestIdentity, RequireAuth, require_auth};
use crate::db::{Database, NewUser, User};
use crate::impl_has_token_manager;
use crate::jwt::{TokenManager, TokenPair};
use crate::password::{hash_password, verify_password};
use crate::rate_limit::{RateLimitConfig, rate_limit_login, rate_limit_register};

const USERNAME_MIN_LEN: usize = 3;
const USERNAME_MAX_LEN: usize = 50;
const PASSWORD_MIN_LEN: usize = 6;

const DUPLICATE_USER: &str = "User with this email or username already exists";

#[derive(Clone)]
pub struct AuthState {
    pub db: Database,
    pub tokens: Arc<TokenManager>,
    pub rate_limit: Arc<RateLimitConfig>,
}

impl_has_token_manager!(AuthState);

pub fn router(state: AuthState) -> Router {
    let login_router = Router::new()
        .route("/login", post(login))
        .with_state(state.clone())
        .route_layer(from_fn_with_state(
            state.rate_limit.clone(),
            rate_limit_login,
        ));

    let register_router = Router::new()
        .route("/register", post(register))
        .with_state(state.clone())
        .route_layer(from_fn_with_state(
            state.rate_limit.clone(),
            rate_limit_register,
        ));

    let logout_router: Router = Router::new()
        .route("/logout", delete(logout))
        .route_layer(from_fn_with_state(state.tokens.clone(), require_auth));

    Router::new()
        .route("/refresh", post(refresh))
        .route("/profile", get(profile))
        .route("/session", get(session))
        .with_state(state)
        .merge(login_router)
        .merge(register_router)
        .merge(logout_router)
}

#[derive(Deserialize)]
struct RegisterRequest {
    username: String,
    email: String,
    password: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct RefreshRequest {
    #[serde(default)]
    refresh_token: String,
}

#[derive(Serialize)]
struct AuthResponse {
    user: User,
    access_token: String,
    refresh_token: String,
    expires_in: u64,
}

impl AuthResponse {
    fn new(user: User, pair: TokenPair) -> Self {
        Self {
            user,
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            expires_in: pair.expires_in,
        }
    }
}

#[derive(Serialize)]
struct RefreshResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Serialize)]
struct ProfileResponse {
    user: User,
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

#[derive(Serialize)]
struct SessionResponse {
    authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
}

fn validate_username(username: &str) -> Result<(), ApiError> {
    let len = username.chars().count();
    if len < USERNAME_MIN_LEN || len > USERNAME_MAX_LEN {
        return Err(ApiError::bad_request(format!(
            "Username must be between {} and {} characters",
            USERNAME_MIN_LEN, USERNAME_MAX_LEN
        )));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if !valid {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < PASSWORD_MIN_LEN {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {} characters",
            PASSWORD_MIN_LEN
        )));
    }
    Ok(())
}

async fn register(
    State(state): State<AuthState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;

    let username = payload.username.trim();
    let email = payload.email.trim().to_lowercase();

    validate_username(username)?;
    validate_email(&email)?;
    validate_password(&payload.password)?;

    let taken = state
        .db
        .users()
        .exists_by_email_or_username(&email, username)
        .await
        .db_err("Failed to check existing users")?;

    if taken {
        return Err(ApiError::conflict(DUPLICATE_USER));
    }

    let password = payload.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .internal_err("Failed to process password")?
        .internal_err("Failed to process password")?;

    let uuid = Uuid::new_v4();
    state
        .db
        .users()
        .create(&NewUser {
            uuid,
            username,
            email: &email,
            password_hash: &password_hash,
            first_name: payload.first_name.trim(),
            last_name: payload.last_name.trim(),
        })
        .await
        .map_err(|e| {
            // A concurrent registration can win the race past the check above.
            if e
                .as_database_error()
                .is_some_and(|d| d.is_unique_violation())
            {
                ApiError::conflict(DUPLICATE_USER)
            } else {
                ApiError::db_error("Failed to create user", e)
            }
        })?;

    let user = state
        .db
        .users()
        .get_by_uuid(uuid)
        .await
        .db_err("Failed to load created user")?
        .ok_or_else(|| ApiError::internal_error("Failed to create user", "row missing"))?;

    let pair = state
        .tokens
        .issue_token_pair(user.uuid, &user.username, &user.email)
        .internal_err("Failed to generate tokens")?;

    info!(user_id = %user.uuid, username = %user.username, "User registered");

    Ok((StatusCode::CREATED, Json(AuthResponse::new(user, pair))))
}

async fn login(
    State(state): State<AuthState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;

    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }

    let user = state
        .db
        .users()
        .get_by_email(&email)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    if !user.is_active {
        return Err(ApiError::unauthorized("Account is inactive"));
    }

    let password = payload.password;
    let stored_hash = user.password_hash.clone();
    let matches = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .internal_err("Failed to verify password")?
        .internal_err("Failed to verify password")?;

    if !matches {
        debug!(user_id = %user.uuid, "Password mismatch");
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let pair = state
        .tokens
        .issue_token_pair(user.uuid, &user.username, &user.email)
        .internal_err("Failed to generate tokens")?;

    info!(user_id = %user.uuid, "User logged in");

    Ok((StatusCode::OK, Json(AuthResponse::new(user, pair))))
}

/// Exchange a refresh token for a new access token. The refresh token is not
/// rotated; it stays valid until its own expiry.
async fn refresh(
    State(state): State<AuthState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;

    if payload.refresh_token.is_empty() {
        return Err(ApiError::bad_request("refresh_token is required"));
    }

    let access_token = state
        .tokens
        .refresh_access_token(&payload.refresh_token)
        .map_err(|e| {
            if e.is_expired() {
                debug!("Refresh token expired");
            } else {
                debug!(error = %e, "Refresh rejected");
            }
            ApiError::unauthorized("Invalid or expired refresh token")
        })?;

    Ok(Json(RefreshResponse {
        access_token,
        expires_in: state.tokens.access_ttl().as_secs(),
    }))
}

async fn profile(
    State(state): State<AuthState>,
    RequireAuth(identity): RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .users()
        .get_by_uuid(identity.user_id)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(ProfileResponse { user }))
}

/// Tokens are stateless, so there is nothing to revoke server-side; the
/// client is expected to discard its tokens.
async fn logout(Extension(identity): Extension<RequestIdentity>) -> impl IntoResponse {
    info!(user_id = %identity.user_id, "User logged out");
    Json(MessageResponse {
        message: "Logged out successfully",
    })
}

async fn session(OptionalAuth(identity): OptionalAuth) -> Json<SessionResponse> {
    match identity {
        Some(identity) => Json(SessionResponse {
            authenticated: true,
            user_id: Some(identity.user_id),
            username: Some(identity.username),
        }),
        None => Json(SessionResponse {
            authenticated: false,
            user_id: None,
            username: None,
        }),
    }
}
