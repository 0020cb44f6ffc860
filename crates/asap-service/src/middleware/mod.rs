//! Middleware for the ASAP Service.
//!
//! # Components
//!
//! - `auth` - ASAP token verification with a reject or anonymous policy
//! - `allowlist` - Issuer allow-list for protected routes
//! - `http_metrics` - Request counters and latency for every response

pub mod allowlist;
pub mod auth;
pub mod http_metrics;

pub use allowlist::require_authorized_issuer;
pub use auth::{asap_auth, AuthState, ClaimsExt};
pub use http_metrics::http_metrics_middleware;
