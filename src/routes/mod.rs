use axum::Router;

use crate::state::SharedState;

/// Swagger UI and the generated OpenAPI document.
pub mod docs;
/// Health check endpoint.
pub mod health;
/// Team session start and play-state endpoints.
pub mod sessions;
/// Server-sent events stream.
pub mod sse;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router().merge(sse::router()).merge(sessions::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
