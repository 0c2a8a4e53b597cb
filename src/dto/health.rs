use serde::Serialize;
use utoipa::ToSchema;

/// Health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Overall status ("ok" or "degraded").
    pub status: String,
    /// Whether the last external host probe succeeded.
    pub host_healthy: bool,
}

impl HealthResponse {
    /// Create a health response indicating the system is operational.
    pub fn ok(host_healthy: bool) -> Self {
        Self {
            status: "ok".to_string(),
            host_healthy,
        }
    }

    /// Create a health response indicating the system is in degraded mode.
    pub fn degraded(host_healthy: bool) -> Self {
        Self {
            status: "degraded".to_string(),
            host_healthy,
        }
    }
}
