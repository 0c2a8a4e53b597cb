use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::dao::models::{GamePlayState, PlayerRole};
use crate::dto::validation::validate_distinct_team_ids;
use crate::services::session_window::SessionWindow;

/// Identity of the caller issuing a command. Authentication itself happens
/// upstream; this only carries what the orchestrator needs.
#[derive(Debug, Clone)]
pub struct Actor {
    /// Stable identifier of the caller.
    pub id: String,
    /// Whether the caller holds an elevated (administrative) role. Elevated
    /// callers bypass late-start truncation and membership checks.
    pub is_elevated: bool,
}

impl Actor {
    /// Build an anonymous, non-elevated actor.
    pub fn anonymous() -> Self {
        Self {
            id: "anonymous".into(),
            is_elevated: false,
        }
    }
}

/// Request to start play sessions for one or more teams of a single game.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct StartSessionsRequest {
    /// Teams to start. Must be non-empty, free of duplicates, and all belong
    /// to the same game.
    #[validate(
        length(min = 1, message = "at least one team id is required"),
        custom(function = validate_distinct_team_ids)
    )]
    pub team_ids: Vec<Uuid>,
}

/// Play window shared by every team in a start batch.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionWindowDto {
    /// Window start.
    #[serde(with = "time::serde::rfc3339")]
    pub begin: OffsetDateTime,
    /// Window end.
    #[serde(with = "time::serde::rfc3339")]
    pub end: OffsetDateTime,
    /// Effective length in whole minutes.
    pub length_minutes: i64,
    /// Whether the window was truncated against the game end.
    pub is_late_start: bool,
}

impl From<&SessionWindow> for SessionWindowDto {
    fn from(window: &SessionWindow) -> Self {
        Self {
            begin: window.begin,
            end: window.end,
            length_minutes: window.length_minutes,
            is_late_start: window.is_late_start,
        }
    }
}

/// Roster member inside a start summary.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayerSummary {
    /// Enrollment id.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Roster role.
    pub role: PlayerRole,
}

/// Per-team outcome of a successful start.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TeamStartSummary {
    /// Team that was started.
    pub team_id: Uuid,
    /// Captain's display name, if the roster declares one.
    pub captain: Option<String>,
    /// Full roster, captain first.
    pub roster: Vec<PlayerSummary>,
    /// Whether external resources are still being provisioned.
    pub resources_deploying: bool,
    /// The team's play window.
    pub window: SessionWindowDto,
}

/// Result of a start command. `teams` preserves request order.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StartSessionsResponse {
    /// Game whose teams were started.
    pub game_id: Uuid,
    /// Window shared by the whole batch.
    pub window: SessionWindowDto,
    /// Per-team summaries keyed by team id.
    pub teams: IndexMap<Uuid, TeamStartSummary>,
}

/// Derived play state of a game.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayStateResponse {
    /// Game the state was derived for.
    pub game_id: Uuid,
    /// Current derived state.
    pub state: GamePlayState,
}
