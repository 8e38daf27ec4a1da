//! Authentication state trait and macro.

use std::sync::Arc;

use crate::jwt::TokenManager;

/// Trait for router state types that give the auth extractors access to the
/// token manager.
pub trait HasTokenManager {
    fn tokens(&self) -> &TokenManager;
}

impl HasTokenManager for Arc<TokenManager> {
    fn tokens(&self) -> &TokenManager {
        self
    }
}

/// Implement `HasTokenManager` for a state struct with a
/// `tokens: Arc<TokenManager>` field.
///
/// # Example
/// ```ignore
/// #[derive(Clone)]
/// pub struct MyState {
///     pub tokens: Arc<TokenManager>,
/// }
///
/// impl_has_token_manager!(MyState);
/// ```
#[macro_export]
macro_rules! impl_has_token_manager {
    ($state_type:ty) => {
        impl $crate::auth::HasTokenManager for $state_type {
            fn tokens(&self) -> &$crate::jwt::TokenManager {
                &self.tokens
            }
        }
    };
}
