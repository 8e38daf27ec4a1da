//! Bearer-token authorization gate.
//!
//! Reads `Authorization: Bearer <token>`, validates it as an access token and
//! hands downstream handlers a typed [`RequestIdentity`]. Available both as
//! extractors (`RequireAuth`, `OptionalAuth`) and as route-layer middleware
//! (`require_auth`, `optional_auth`).

mod bearer;
mod errors;
mod extractors;
mod ip;
mod middleware;
mod state;
mod types;

pub use bearer::{AuthFailure, authenticate, bearer_token};
pub use errors::ApiAuthError;
pub use extractors::{OptionalAuth, RequireAuth};
pub use ip::{UNKNOWN_CLIENT, client_ip};
pub use middleware::{optional_auth, require_auth};
pub use state::HasTokenManager;
pub use types::RequestIdentity;
