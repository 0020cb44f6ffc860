//! # ASAP Test Utilities
//!
//! Shared test utilities for the ASAP crates.
//!
//! This crate provides:
//! - Fixed key pairs (RSA and EC) for reproducible signatures
//! - `TestTokenBuilder` for minting valid and deliberately broken tokens
//! - `TestKeyRepository`, a mock public key repository on a random port
//! - Custom assertions (`TokenAssertions` trait)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use asap_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let repo = TestKeyRepository::start().await;
//!     repo.serve_key(RSA_PRIMARY.key_id("svc-a"), RSA_PRIMARY.public_pem).await;
//!
//!     let token = TestTokenBuilder::new("svc-a", "svc-b")
//!         .signed_with(&RSA_PRIMARY)
//!         .build();
//!
//!     token.assert_issuer("svc-a").assert_audience("svc-b");
//! }
//! ```

pub mod assertions;
pub mod crypto_fixtures;
pub mod key_server;
pub mod token_builders;

// Re-export commonly used items
pub use assertions::*;
pub use crypto_fixtures::*;
pub use key_server::*;
pub use token_builders::*;
