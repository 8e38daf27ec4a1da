//! Bearer header parsing and the core authentication check.

use axum::http::{HeaderMap, header};

use super::types::RequestIdentity;
use crate::jwt::{JwtError, TokenManager, TokenType};

/// Why a request failed authentication. Callers outside this module only
/// ever see a generic unauthorized response.
#[derive(Debug)]
pub enum AuthFailure {
    MissingHeader,
    MalformedHeader,
    InvalidToken(JwtError),
    WrongTokenType,
}

impl AuthFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthFailure::MissingHeader => "missing_header",
            AuthFailure::MalformedHeader => "malformed_header",
            AuthFailure::InvalidToken(_) => "invalid_token",
            AuthFailure::WrongTokenType => "wrong_token_type",
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
///
/// The value must split into exactly two whitespace-separated parts and the
/// first must be literally `Bearer`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthFailure> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthFailure::MissingHeader)?
        .to_str()
        .map_err(|_| AuthFailure::MalformedHeader)?;

    let mut parts = value.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) => Ok(token),
        (None, _, _) => Err(AuthFailure::MissingHeader),
        _ => Err(AuthFailure::MalformedHeader),
    }
}

/// Run the full gate check against a request's headers.
pub fn authenticate(
    headers: &HeaderMap,
    tokens: &TokenManager,
) -> Result<RequestIdentity, AuthFailure> {
    let token = bearer_token(headers)?;

    let claims = tokens
        .validate_token(token)
        .map_err(AuthFailure::InvalidToken)?;

    if claims.token_type != TokenType::Access {
        return Err(AuthFailure::WrongTokenType);
    }

    Ok(RequestIdentity::from(claims))
}
