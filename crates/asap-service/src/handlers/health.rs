//! Liveness probe.

use axum::Json;
use serde::Serialize;
use tracing::instrument;

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Handler for GET /health
///
/// Always `{"status":"healthy"}`; the service has no dependencies that must
/// be up before it can answer. Key repositories are only contacted per token.
#[instrument(skip_all, name = "asap.health.check")]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}
