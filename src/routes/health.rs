use axum::{Json, Router, routing::get};

use crate::{dto::health::HealthResponse, services::health_service, state::SharedState};

/// Routes exposing the liveness probe.
pub fn router() -> Router<SharedState> {
    Router::new().route("/health", get(healthcheck))
}

/// Report process liveness.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn healthcheck() -> Json<HealthResponse> {
    Json(health_service::health())
}
