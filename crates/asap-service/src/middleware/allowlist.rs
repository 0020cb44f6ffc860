//! Issuer allow-list middleware.
//!
//! Must run inside [`asap_auth`](super::asap_auth): it only looks at claims
//! that middleware stored. Anonymous requests are denied.

use crate::errors::AsapRejection;
use asap_core::{AsapClaims, IssuerAllowList};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::instrument;

#[instrument(skip_all, name = "asap.middleware.allowlist")]
pub async fn require_authorized_issuer(
    State(allow_list): State<Arc<IssuerAllowList>>,
    req: Request,
    next: Next,
) -> Result<Response, AsapRejection> {
    if let Err(err) = allow_list.authorize(req.extensions().get::<AsapClaims>()) {
        tracing::warn!(
            target: "asap.service.middleware",
            error = %err.describe(),
            "Request denied by issuer allow-list"
        );
        return Err(AsapRejection(err));
    }

    Ok(next.run(req).await)
}
