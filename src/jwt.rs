//! JWT token issuance and validation.
//!
//! Access and refresh tokens are both stateless HS256 JWTs carrying the same
//! identity snapshot. Nothing is stored server-side, so a token stays valid
//! until its `exp` regardless of what happens to the user record.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issuer claim stamped on every token and pinned during validation.
pub const ISSUER: &str = "modernblog-api";

/// Access token duration default: 15 minutes
pub const DEFAULT_ACCESS_TTL: Duration = Duration::from_secs(15 * 60);

/// Refresh token duration default: 7 days
pub const DEFAULT_REFRESH_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Longest accepted TTL. Keeps `iat + ttl` well inside the range of a
/// signed 64-bit timestamp.
pub const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Header algorithms accepted on verification. Anything else is refused
/// before a key is ever touched.
const ALLOWED_ALGORITHMS: [(&str, Algorithm); 3] = [
    ("HS256", Algorithm::HS256),
    ("HS384", Algorithm::HS384),
    ("HS512", Algorithm::HS512),
];

/// Token type for distinguishing access vs refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived token accepted by the authorization gate
    Access,
    /// Long-lived token only accepted by the refresh exchange
    Refresh,
}

/// JWT claims shared by access and refresh tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User UUID
    pub user_id: Uuid,
    /// Username at issuance time
    pub username: String,
    /// Email at issuance time
    pub email: String,
    /// Token type
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Not before (Unix timestamp)
    pub nbf: u64,
    /// Issuer, always [`ISSUER`]
    pub iss: String,
    /// Subject, string form of `user_id`
    pub sub: String,
}

/// Construction input for [`TokenManager`].
#[derive(Clone)]
pub struct TokenConfig {
    /// HMAC signing secret
    pub secret: Vec<u8>,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    /// Clock-skew tolerance applied to `exp` and `nbf`, in seconds
    pub leeway_secs: u64,
}

impl TokenConfig {
    /// Config with the default TTLs and zero leeway.
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
            access_ttl: DEFAULT_ACCESS_TTL,
            refresh_ttl: DEFAULT_REFRESH_TTL,
            leeway_secs: 0,
        }
    }

    pub fn with_ttls(mut self, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        self.access_ttl = access_ttl;
        self.refresh_ttl = refresh_ttl;
        self
    }

    pub fn with_leeway(mut self, leeway_secs: u64) -> Self {
        self.leeway_secs = leeway_secs;
        self
    }
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("leeway_secs", &self.leeway_secs)
            .finish()
    }
}

/// Freshly issued access/refresh pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: u64,
}

/// Issues and validates tokens. Immutable after construction and safe to
/// share across requests.
#[derive(Clone)]
pub struct TokenManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl_secs: u64,
    refresh_ttl_secs: u64,
    leeway_secs: u64,
}

impl TokenManager {
    pub fn new(config: TokenConfig) -> Result<Self, JwtError> {
        if config.secret.is_empty() {
            return Err(JwtError::InvalidConfig("signing secret is empty"));
        }

        let access_ttl_secs = config.access_ttl.as_secs();
        let refresh_ttl_secs = config.refresh_ttl.as_secs();

        if access_ttl_secs == 0 || refresh_ttl_secs == 0 {
            return Err(JwtError::InvalidConfig("token TTLs must be at least one second"));
        }
        if refresh_ttl_secs > MAX_TTL.as_secs() {
            return Err(JwtError::InvalidConfig("refresh TTL exceeds the maximum"));
        }
        if access_ttl_secs >= refresh_ttl_secs {
            return Err(JwtError::InvalidConfig(
                "access TTL must be shorter than refresh TTL",
            ));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(&config.secret),
            decoding_key: DecodingKey::from_secret(&config.secret),
            access_ttl_secs,
            refresh_ttl_secs,
            leeway_secs: config.leeway_secs,
        })
    }

    pub fn access_ttl(&self) -> Duration {
        Duration::from_secs(self.access_ttl_secs)
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_ttl_secs)
    }

    /// Issue an access/refresh pair from one identity snapshot.
    pub fn issue_token_pair(
        &self,
        user_id: Uuid,
        username: &str,
        email: &str,
    ) -> Result<TokenPair, JwtError> {
        self.issue_token_pair_at(user_id, username, email, now_secs())
    }

    fn issue_token_pair_at(
        &self,
        user_id: Uuid,
        username: &str,
        email: &str,
        now: u64,
    ) -> Result<TokenPair, JwtError> {
        let access_token = self.sign(user_id, username, email, TokenType::Access, now)?;
        let refresh_token = self.sign(user_id, username, email, TokenType::Refresh, now)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.access_ttl_secs,
        })
    }

    fn sign(
        &self,
        user_id: Uuid,
        username: &str,
        email: &str,
        token_type: TokenType,
        now: u64,
    ) -> Result<String, JwtError> {
        let ttl = match token_type {
            TokenType::Access => self.access_ttl_secs,
            TokenType::Refresh => self.refresh_ttl_secs,
        };

        let exp = now
            .checked_add(ttl)
            .ok_or(JwtError::InvalidConfig("token expiry overflows"))?;

        let claims = Claims {
            user_id,
            username: username.to_string(),
            email: email.to_string(),
            token_type,
            iat: now,
            exp,
            nbf: now,
            iss: ISSUER.to_string(),
            sub: user_id.to_string(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(JwtError::Signing)
    }

    /// Verify signature and validity window, returning the decoded claims.
    /// The token type is not checked here.
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let algorithm = header_algorithm(token)?;

        let mut validation = Validation::new(algorithm);
        validation.leeway = self.leeway_secs;
        validation.validate_nbf = true;
        validation.set_issuer(&[ISSUER]);
        validation.set_required_spec_claims(&["exp", "nbf", "iss", "sub"]);

        let claims = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(JwtError::from)?
            .claims;

        if claims.sub != claims.user_id.to_string() {
            return Err(JwtError::MalformedToken);
        }

        Ok(claims)
    }

    /// Validate a token and require it to be an access token.
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, JwtError> {
        self.validate_typed(token, TokenType::Access)
    }

    /// Validate a token and require it to be a refresh token.
    pub fn validate_refresh_token(&self, token: &str) -> Result<Claims, JwtError> {
        self.validate_typed(token, TokenType::Refresh)
    }

    fn validate_typed(&self, token: &str, expected: TokenType) -> Result<Claims, JwtError> {
        let claims = self.validate_token(token)?;
        if claims.token_type != expected {
            return Err(JwtError::WrongTokenType);
        }
        Ok(claims)
    }

    /// Exchange a refresh token for a new access token carrying the same
    /// identity. The refresh token is left untouched and stays usable until
    /// it expires.
    pub fn refresh_access_token(&self, refresh_token: &str) -> Result<String, JwtError> {
        let claims = self.validate_refresh_token(refresh_token)?;
        self.sign(
            claims.user_id,
            &claims.username,
            &claims.email,
            TokenType::Access,
            now_secs(),
        )
    }
}

#[derive(Deserialize)]
struct RawHeader {
    alg: String,
}

/// Read the `alg` header field and refuse anything outside the HMAC family.
fn header_algorithm(token: &str) -> Result<Algorithm, JwtError> {
    let mut segments = token.split('.');
    let (Some(header), Some(_), Some(_), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(JwtError::MalformedToken);
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|_| JwtError::MalformedToken)?;
    let raw: RawHeader = serde_json::from_slice(&bytes).map_err(|_| JwtError::MalformedToken)?;

    ALLOWED_ALGORITHMS
        .iter()
        .find(|(name, _)| *name == raw.alg)
        .map(|(_, alg)| *alg)
        .ok_or(JwtError::UnsupportedAlgorithm(raw.alg))
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Errors that can occur during JWT operations.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("malformed token")]
    MalformedToken,
    #[error("unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("token is not valid yet")]
    NotYetValid,
    #[error("token issuer mismatch")]
    InvalidIssuer,
    #[error("wrong token type")]
    WrongTokenType,
    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("invalid token configuration: {0}")]
    InvalidConfig(&'static str),
}

impl JwtError {
    /// Whether the token was rejected only because its lifetime ran out.
    pub fn is_expired(&self) -> bool {
        matches!(self, JwtError::Expired)
    }
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::InvalidSignature => JwtError::InvalidSignature,
            ErrorKind::ExpiredSignature => JwtError::Expired,
            ErrorKind::ImmatureSignature => JwtError::NotYetValid,
            ErrorKind::InvalidIssuer => JwtError::InvalidIssuer,
            ErrorKind::InvalidAlgorithm => {
                JwtError::UnsupportedAlgorithm("algorithm mismatch".to_string())
            }
            _ => JwtError::MalformedToken,
        }
    }
}
