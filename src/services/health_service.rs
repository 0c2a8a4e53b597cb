use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report the current degraded/host flags, logging connectivity issues.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.require_game_store().await {
        Ok(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "storage health check failed");
            }
        }
        Err(_) => warn!("storage unavailable (degraded mode)"),
    }

    let host_healthy = state.is_host_healthy();
    if state.is_degraded().await {
        HealthResponse::degraded(host_healthy)
    } else {
        HealthResponse::ok(host_healthy)
    }
}
