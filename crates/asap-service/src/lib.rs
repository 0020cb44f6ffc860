//! ASAP Service Library
//!
//! axum integration for ASAP authentication plus a small HTTP service built
//! on it:
//!
//! - Authentication middleware with a reject or anonymous policy
//! - Issuer allow-list middleware
//! - 401 JSON error responses with `WWW-Authenticate`
//! - `/health`, `/v1/claims` and `/metrics` endpoints
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> middleware/*.rs -> handlers/*.rs
//! ```
//!
//! # Modules
//!
//! - `config` - Service configuration from environment
//! - `errors` - Rejections with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Authentication, allow-list and HTTP metrics layers
//! - `observability` - Prometheus recorder and metric helpers
//! - `routes` - Axum router setup

#![warn(clippy::pedantic)]

pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod routes;
