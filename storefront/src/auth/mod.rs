//! Authentication middleware

pub mod user_auth;

pub use user_auth::{Role, UserIdentity, admin_only, user_auth_middleware};
