//! HTTP middleware for the identity verifier.

pub mod auth;

pub use auth::{require_auth, AuthState, IdentityExt};
