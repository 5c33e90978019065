use axum::Json;

use crate::dto::HealthResponse;

/// GET /health - Liveness probe, no auth.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
