//! Authentication Module
//! Mission: Accounts, JWT sessions, password resets and role gates

pub mod account_store;
pub mod api;
pub mod jwt;
pub mod middleware;
pub mod models;

use std::sync::Arc;

pub use account_store::AccountStore;
pub use jwt::JwtHandler;
pub use middleware::{auth_middleware, authenticate, authorize, authorize_owner, require_host};
pub use models::{AuthContext, Role};

/// Shared auth state
#[derive(Clone)]
pub struct AuthState {
    pub accounts: AccountStore,
    pub jwt_handler: Arc<JwtHandler>,
    /// Dev mode: echo reset tokens from forgot-password
    pub expose_reset_token: bool,
}
