//! Health probe payload.

use serde::Serialize;
use utoipa::ToSchema;

/// Liveness response.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always `"ok"` while the process is serving.
    pub status: &'static str,
    /// Crate version baked in at build time.
    pub version: &'static str,
}

impl HealthResponse {
    /// Current process health.
    pub fn ok() -> Self {
        Self {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}
