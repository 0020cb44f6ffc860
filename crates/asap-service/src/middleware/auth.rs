//! ASAP authentication middleware.
//!
//! Reads the `Authorization` header, verifies it with the shared
//! [`Authenticator`], and stores verified claims in request extensions.
//! Requests without an ASAP token pass through without claims; whether that
//! is acceptable is decided further in by the allow-list or the handler.

use crate::config::AuthMode;
use crate::errors::AsapRejection;
use asap_core::{AsapClaims, Authenticator};
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::instrument;

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    pub authenticator: Arc<Authenticator>,
    pub mode: AuthMode,
}

/// Authentication middleware.
///
/// # Response
///
/// - Invalid token in `Reject` mode: 401 with `WWW-Authenticate`
/// - Invalid token in `Anonymous` mode: continues without claims
/// - Valid token: continues with [`AsapClaims`] in extensions
#[instrument(skip_all, name = "asap.middleware.auth")]
pub async fn asap_auth(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AsapRejection> {
    // A non-ASCII header cannot hold a token; treat it like any other scheme
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    match state.authenticator.authenticate(header).await {
        Ok(Some(claims)) => {
            req.extensions_mut().insert(claims);
        }
        Ok(None) => {
            tracing::debug!(target: "asap.service.middleware", "No ASAP token on request");
        }
        Err(err) => match state.mode {
            AuthMode::Reject => return Err(AsapRejection(err)),
            AuthMode::Anonymous => {
                tracing::debug!(
                    target: "asap.service.middleware",
                    error = %err.describe(),
                    "Continuing without claims"
                );
            }
        },
    }

    Ok(next.run(req).await)
}

/// Extension trait for extracting claims from a request.
pub trait ClaimsExt {
    /// Verified claims, or `None` for anonymous requests or routes without
    /// the auth middleware.
    fn asap_claims(&self) -> Option<&AsapClaims>;
}

impl<B> ClaimsExt for axum::http::Request<B> {
    fn asap_claims(&self) -> Option<&AsapClaims> {
        self.extensions().get::<AsapClaims>()
    }
}
