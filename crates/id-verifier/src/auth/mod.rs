//! Identity token verification.
//!
//! # Components
//!
//! - `jwk` - JWK entries and RSA signing keys
//! - `key_store` - Cached key set with `Expires`-driven refresh
//! - `token` - Structural parsing of compact tokens
//! - `claims` - Claim checks and the verified identity
//! - `verifier` - End-to-end verification

pub mod claims;
pub mod jwk;
pub mod key_store;
pub mod token;
pub mod verifier;

pub use claims::{Claims, VerifiedIdentity};
pub use jwk::SigningKey;
pub use key_store::KeyStore;
pub use token::ParsedToken;
pub use verifier::TokenVerifier;
