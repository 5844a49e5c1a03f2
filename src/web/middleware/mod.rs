//! Middleware for the HTTP surface.

pub mod auth;
pub mod cors;

pub use auth::{credential_auth, AuthUser};
pub use cors::create_cors_layer;
