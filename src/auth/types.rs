//! Authentication user types.

use serde::Serialize;
use uuid::Uuid;

use crate::jwt::Claims;

/// Verified identity attached to a request by the authorization gate.
///
/// Fields are the snapshot embedded in the access token at issuance time;
/// they are not re-read from the user store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestIdentity {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
}

impl From<Claims> for RequestIdentity {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.user_id,
            username: claims.username,
            email: claims.email,
        }
    }
}
