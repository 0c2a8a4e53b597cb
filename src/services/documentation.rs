use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the skirmish backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sessions::start_sessions,
        crate::routes::sessions::play_state,
        crate::routes::sse::events_stream,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::sessions::StartSessionsRequest,
            crate::dto::sessions::StartSessionsResponse,
            crate::dto::sessions::TeamStartSummary,
            crate::dto::sessions::PlayerSummary,
            crate::dto::sessions::SessionWindowDto,
            crate::dto::sessions::PlayStateResponse,
            crate::dto::sse::LaunchStartedEvent,
            crate::dto::sse::LaunchEndedEvent,
            crate::dto::sse::LaunchFailedEvent,
            crate::dto::sse::TeamSessionStartedEvent,
            crate::dao::models::GamePlayState,
            crate::dao::models::GameEngine,
            crate::dao::models::ExternalDeployStatus,
            crate::dao::models::PlayerRole,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sessions", description = "Team session start and play state"),
        (name = "sse", description = "Server-sent events stream"),
    )
)]
pub struct ApiDoc;
