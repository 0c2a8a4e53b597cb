use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// Dispatched payload carried across the events SSE channel.
#[derive(Clone, Debug)]
pub struct ServerEvent {
    /// SSE event name, if any.
    pub event: Option<String>,
    /// JSON-encoded event body.
    pub data: String,
}

impl ServerEvent {
    /// Build an event from a name and a pre-rendered body.
    pub fn new(event: Option<String>, data: String) -> Self {
        Self { event, data }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

/// Emitted when a start orchestration begins its critical section.
#[derive(Debug, Serialize, ToSchema)]
pub struct LaunchStartedEvent {
    /// Game being started.
    pub game_id: Uuid,
    /// Teams in the batch.
    pub team_ids: Vec<Uuid>,
    /// Caller who issued the start.
    pub actor: String,
}

/// Emitted when a start orchestration completes successfully.
#[derive(Debug, Serialize, ToSchema)]
pub struct LaunchEndedEvent {
    /// Game that was started.
    pub game_id: Uuid,
    /// Teams in the batch.
    pub team_ids: Vec<Uuid>,
    /// Caller who issued the start.
    pub actor: String,
}

/// Emitted when a start orchestration failed and was rolled back.
#[derive(Debug, Serialize, ToSchema)]
pub struct LaunchFailedEvent {
    /// Game whose start failed.
    pub game_id: Uuid,
    /// Teams that were reset.
    pub team_ids: Vec<Uuid>,
    /// Caller who issued the start.
    pub actor: String,
    /// Human-readable failure summary.
    pub error: String,
}

/// Emitted once per team when its session timestamps are committed.
#[derive(Debug, Serialize, ToSchema)]
pub struct TeamSessionStartedEvent {
    /// Game the team belongs to.
    pub game_id: Uuid,
    /// Team whose session started.
    pub team_id: Uuid,
    /// Caller who issued the start.
    pub actor: String,
}
