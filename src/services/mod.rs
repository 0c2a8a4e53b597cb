/// OpenAPI documentation generation.
pub mod documentation;
/// Launch lifecycle SSE notifications.
pub mod events;
/// Game-mode start policies and the mode factory.
pub mod game_mode;
/// Challenge solve scoring with per-challenge serialization.
pub mod grading;
/// Health check service.
pub mod health_service;
/// Host connectivity supervisor.
pub mod host_supervisor;
/// Compensating team session resets.
pub mod session_reset;
/// Session window calculation.
pub mod session_window;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Start orchestration for team sessions.
pub mod start_service;
/// Storage installation and degraded-mode supervision.
pub mod storage_supervisor;
/// Synchronized start readiness aggregation.
pub mod sync_start;
