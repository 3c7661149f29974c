//! Observability for the identity verifier.

pub mod metrics;
