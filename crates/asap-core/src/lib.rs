//! ASAP service-to-service authentication.
//!
//! Services mint short-lived signed tokens with an [`Issuer`] and verify
//! incoming tokens with an [`Authenticator`], which resolves the issuer's
//! public key from its key id.
//!
//! ```rust,ignore
//! use asap_core::{Authenticator, AuthenticatorConfig, Issuer, IssuerConfig, KeySource};
//!
//! // Caller side
//! let issuer = Issuer::new(IssuerConfig::new(private_pem, "svc-a/key1", "svc-a", "svc-b"))?;
//! let header = issuer.auth_header()?;
//!
//! // Receiver side
//! let authenticator = Authenticator::new(AuthenticatorConfig::new(
//!     "svc-b",
//!     KeySource::RepositoryUrls(vec!["https://keys.example.com/".to_string()]),
//! ))?;
//! let claims = authenticator.authenticate(Some(header.expose_secret())).await?;
//! ```

#![warn(clippy::pedantic)]

pub mod authenticator;
pub mod authorization;
pub mod claims;
pub mod client;
pub mod config;
pub mod error;
pub mod issuer;
pub mod jwt;
pub mod keys;
pub mod metrics;
pub mod secret;
pub mod validation;

pub use authenticator::Authenticator;
pub use authorization::IssuerAllowList;
pub use claims::{AsapClaims, Audience};
pub use client::{AsapClient, AsapRequestExt};
pub use config::{AuthenticatorConfig, IssuerConfig};
pub use error::{AsapError, ConfigError, IssuerError, KeyFetchError};
pub use issuer::Issuer;
pub use keys::{KeyCache, KeySource, PublicKeyLoader};
