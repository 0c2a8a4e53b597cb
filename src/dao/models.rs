use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// Engine responsible for running a game's challenges.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GameEngine {
    /// Challenges are played entirely inside this application.
    Standard,
    /// Challenges run on externally provisioned resources (VMs, containers).
    External,
}

/// Derived play state for a game or a single team. Never persisted; always
/// recomputed from session timestamps and, for external games, deploy status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GamePlayState {
    /// No session exists yet.
    NotStarted,
    /// A start is underway but not every part is in place.
    Starting,
    /// External resources are being provisioned.
    DeployingResources,
    /// The session is live.
    Started,
    /// The session (or the game itself) has ended.
    GameOver,
}

/// Per-team provisioning status reported by the external resource host.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExternalDeployStatus {
    /// No deployment has been requested.
    NotStarted,
    /// The host is provisioning the team's resources.
    Deploying,
    /// Some, but not all, of the team's resources are up.
    PartiallyDeployed,
    /// All resources are up and reachable.
    Deployed,
    /// The last deployment attempt failed.
    Failed,
}

/// Compensation applied to a team when a start attempt fails partway through.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TeamSessionResetType {
    /// Close out active challenges and clear session timestamps.
    ArchiveChallenges,
    /// Clear session timestamps only; leave challenge records untouched.
    PreserveChallenges,
    /// Archive challenges and remove the team's roster entirely.
    UnenrollAndArchiveChallenges,
}

/// Role a player holds inside their team.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PlayerRole {
    /// Regular roster member.
    Member,
    /// Team captain; reported first in start summaries.
    Captain,
}

/// Game configuration persisted by the storage layer. Read-only for the
/// duration of a start operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameEntity {
    /// Primary key of the game.
    pub id: Uuid,
    /// Display name of the exercise.
    pub name: String,
    /// Engine running this game's challenges.
    pub engine: GameEngine,
    /// Whether every team must start with one shared window.
    pub require_synchronized_start: bool,
    /// Nominal session length in minutes.
    pub session_minutes: i64,
    /// Earliest instant at which sessions may begin.
    pub game_start: OffsetDateTime,
    /// Hard end of the game; non-privileged windows never extend past it.
    pub game_end: OffsetDateTime,
    /// Whether sessions may start when the nominal window would be truncated.
    pub allow_late_start: bool,
    /// Smallest roster allowed to start.
    pub min_team_size: usize,
    /// Largest roster allowed to start.
    pub max_team_size: usize,
    /// Maximum concurrent sessions, 0 meaning unlimited.
    pub session_limit: usize,
}

/// Player enrollment record. Session fields live here: a team is "started"
/// exactly when its players carry session timestamps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerEntity {
    /// Primary key of the enrollment.
    pub id: Uuid,
    /// Team this player belongs to.
    pub team_id: Uuid,
    /// Game the team is enrolled in.
    pub game_id: Uuid,
    /// Display name.
    pub name: String,
    /// Roster role.
    pub role: PlayerRole,
    /// Start of the play window, unset while not started.
    pub session_begin: Option<OffsetDateTime>,
    /// End of the play window, unset while not started.
    pub session_end: Option<OffsetDateTime>,
    /// Effective session length in minutes once started.
    pub session_minutes: i64,
    /// Whether the window was truncated against the game end.
    pub is_late_start: bool,
}

impl PlayerEntity {
    /// Whether this player's session fields are set.
    pub fn session_started(&self) -> bool {
        self.session_begin.is_some() && self.session_end.is_some()
    }
}

/// Per-team record mirroring the externally hosted resources.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExternalResourceEntity {
    /// Team owning the provisioned resources.
    pub team_id: Uuid,
    /// Game the resources belong to.
    pub game_id: Uuid,
    /// Last status reported by the host.
    pub deploy_status: ExternalDeployStatus,
    /// Window start pushed out for synchronized games.
    pub session_begin: Option<OffsetDateTime>,
    /// Window end pushed out for synchronized games.
    pub session_end: Option<OffsetDateTime>,
}

/// A team's instance of one challenge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChallengeEntity {
    /// Primary key of the challenge instance.
    pub id: Uuid,
    /// Specification this instance was created from.
    pub spec_id: Uuid,
    /// Team playing the challenge.
    pub team_id: Uuid,
    /// Game the challenge belongs to.
    pub game_id: Uuid,
    /// Base points awarded for a full solve.
    pub points: i32,
    /// Current score.
    pub score: i32,
    /// When the team opened the challenge.
    pub started_at: OffsetDateTime,
    /// Set when the challenge was closed out (solve or archive).
    pub ended_at: Option<OffsetDateTime>,
    /// Set when the team fully solved the challenge.
    pub solved_at: Option<OffsetDateTime>,
}

/// Session fields written in one bulk update for a whole start batch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionStamp {
    /// Window start.
    pub begin: OffsetDateTime,
    /// Window end.
    pub end: OffsetDateTime,
    /// Effective length in whole minutes.
    pub length_minutes: i64,
    /// Whether the window was truncated against the game end.
    pub is_late_start: bool,
}
