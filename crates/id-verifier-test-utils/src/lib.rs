//! # ID Verifier Test Utilities
//!
//! Shared test utilities for the identity verifier.
//!
//! This crate provides:
//! - Fixed RSA keypairs (checked-in DER fixtures for reproducible tests)
//! - Claim builders (TestClaimsBuilder)
//! - Key-distribution endpoint mocks (mount_jwks, http_date)
//! - Server test harness (TestVerifierServer for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use id_verifier_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let server = wiremock::MockServer::start().await;
//!     let keypair = TestKeypair::primary();
//!     mount_jwks(&server, jwks_document(&[&keypair]), &http_date(now + 3600), 1).await;
//!
//!     let token = keypair.sign_claims(&TestClaimsBuilder::new(now).audience("client").build());
//! }
//! ```

pub mod crypto_fixtures;
pub mod jwks_mock;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use jwks_mock::*;
pub use server_harness::*;
pub use token_builders::*;
