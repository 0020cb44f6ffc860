//! Verified claims handler.

use asap_core::AsapClaims;
use axum::{Extension, Json};
use tracing::instrument;

/// Handler for GET /v1/claims
///
/// Returns the verified claims of the caller, or `null` when the request
/// carried no ASAP token (or an invalid one in anonymous mode).
///
/// ## Example Response
///
/// ```json
/// {
///   "iss": "svc-a",
///   "sub": "svc-a",
///   "aud": "svc-b",
///   "iat": 1700000000,
///   "nbf": 1700000000,
///   "exp": 1700000600,
///   "jti": "9f2c..."
/// }
/// ```
#[instrument(skip_all, name = "asap.handlers.claims")]
pub async fn get_claims(claims: Option<Extension<AsapClaims>>) -> Json<Option<AsapClaims>> {
    tracing::debug!(
        target: "asap.service.handlers",
        authenticated = claims.is_some(),
        "Returning caller claims"
    );
    Json(claims.map(|Extension(claims)| claims))
}
