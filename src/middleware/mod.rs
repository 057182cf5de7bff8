// Middleware for the threat monitor API

pub mod auth;
pub mod auth_middleware;
pub mod cors;

pub use auth::AuthenticatedUser;
pub use auth_middleware::require_identity;
pub use cors::{dynamic_cors_middleware, select_allowed_origin};
