//! Liveness probe.

use crate::dto::health::HealthResponse;

/// Report process health.
pub fn health() -> HealthResponse {
    HealthResponse::ok()
}
