//! Authentication error types.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::bearer::AuthFailure;

/// Rejection returned by the required-auth gate. Every failure kind renders
/// the same 401 body so clients cannot tell which check tripped.
#[derive(Debug)]
pub struct ApiAuthError {
    pub(super) failure: AuthFailure,
}

impl ApiAuthError {
    /// The internal failure kind, for logging and tests.
    pub fn failure(&self) -> &AuthFailure {
        &self.failure
    }
}

impl From<AuthFailure> for ApiAuthError {
    fn from(failure: AuthFailure) -> Self {
        Self { failure }
    }
}

impl IntoResponse for ApiAuthError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: &'static str,
        }

        let mut response = (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "Unauthorized",
            }),
        )
            .into_response();

        response
            .headers_mut()
            .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));

        response
    }
}
