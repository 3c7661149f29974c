//! Identity Verifier Library
//!
//! Verifies identity tokens issued by an external OpenID provider and turns
//! them into a trusted `VerifiedIdentity` (subject ID and email).
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> middleware/auth.rs -> auth/verifier.rs -> auth/key_store.rs
//! ```
//!
//! # Modules
//!
//! - `auth` - Token parsing, key store, signature and claim checks
//! - `clock` - Injectable time source
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Request authentication
//! - `observability` - Prometheus metrics
//! - `routes` - Axum router setup

pub mod auth;
pub mod clock;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod routes;
