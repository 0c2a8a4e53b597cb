//! Per-mode start policy: what state a game is in, whether resources deploy at
//! session start, and which preconditions a start request must meet.

pub mod external;
pub mod external_sync;
pub mod standard;

use std::sync::Arc;

use futures::future::BoxFuture;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::dao::{
    game_store::GameStore,
    models::{GameEngine, GameEntity, GamePlayState, PlayerEntity, PlayerRole, TeamSessionResetType},
};
use crate::dto::sessions::Actor;
use crate::error::ServiceError;
use crate::services::sync_start::SyncStartGames;

pub use self::external::ExternalGameModeService;
pub use self::external_sync::ExternalSyncGameModeService;
pub use self::standard::StandardGameModeService;

/// One requested team with its resolved roster.
#[derive(Debug, Clone)]
pub struct TeamRoster {
    /// Team identifier.
    pub team_id: Uuid,
    /// Every enrollment on the team.
    pub players: Vec<PlayerEntity>,
}

impl TeamRoster {
    /// The roster's captain, falling back to the first member when none is
    /// flagged.
    pub fn captain(&self) -> Option<&PlayerEntity> {
        self.players
            .iter()
            .find(|player| player.role == PlayerRole::Captain)
            .or_else(|| self.players.first())
    }
}

/// Everything a mode needs to judge one start request. Built once per request
/// with a single captured `now`.
#[derive(Debug, Clone)]
pub struct StartContext {
    /// The game being started, read fresh at orchestration start.
    pub game: GameEntity,
    /// Requested teams with rosters, in request order.
    pub teams: Vec<TeamRoster>,
    /// Caller identity.
    pub actor: Actor,
    /// Instant captured at the top of the orchestration.
    pub now: OffsetDateTime,
}

impl StartContext {
    /// Team ids in request order.
    pub fn team_ids(&self) -> Vec<Uuid> {
        self.teams.iter().map(|team| team.team_id).collect()
    }
}

/// Mode-specific start policy. One implementation per game mode, selected by
/// [`for_game`]; the orchestrator only ever talks to this interface.
pub trait GameModeService: Send + Sync {
    /// Whether the orchestrator must deploy external resources before marking
    /// sessions started.
    fn deploy_resources_on_session_start(&self) -> bool;

    /// Whether all teams in a request must share one window and start together.
    fn require_synchronized_sessions(&self) -> bool;

    /// Reset policy applied per team when a start fails partway through.
    fn start_fail_reset_type(&self) -> TeamSessionResetType;

    /// Derive the game's aggregate play state. No side effects.
    fn game_play_state<'a>(
        &'a self,
        game_id: Uuid,
    ) -> BoxFuture<'a, Result<GamePlayState, ServiceError>>;

    /// Derive one team's play state. No side effects.
    fn team_play_state<'a>(
        &'a self,
        team_id: Uuid,
    ) -> BoxFuture<'a, Result<GamePlayState, ServiceError>>;

    /// Check every mode-specific precondition for the request. Runs before the
    /// per-game lock is acquired; a failure here means nothing was mutated.
    fn validate_start<'a>(
        &'a self,
        ctx: &'a StartContext,
    ) -> BoxFuture<'a, Result<(), ServiceError>>;

    /// Best-effort mode-specific cleanup invoked before the generic
    /// per-team resets when a start fails mid-flight.
    fn clean_up_failed_deploy<'a>(
        &'a self,
        ctx: &'a StartContext,
        error: &'a ServiceError,
    ) -> BoxFuture<'a, ()>;
}

/// Select the mode service for a game from its persisted configuration.
///
/// Only `{engine, require_synchronized_start}` matter; any combination not
/// represented by a known mode is a configuration error.
pub async fn for_game(
    store: Arc<dyn GameStore>,
    sync: Arc<dyn SyncStartGames>,
    game_id: Uuid,
) -> Result<Box<dyn GameModeService>, ServiceError> {
    let game = store
        .find_game(game_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game `{game_id}` not found")))?;

    match (game.engine, game.require_synchronized_start) {
        (GameEngine::Standard, false) => Ok(Box::new(StandardGameModeService::new(store))),
        (GameEngine::External, false) => Ok(Box::new(ExternalGameModeService::new(store))),
        (GameEngine::External, true) => {
            Ok(Box::new(ExternalSyncGameModeService::new(store, sync)))
        }
        (GameEngine::Standard, true) => Err(ServiceError::InvalidState(format!(
            "game `{game_id}` is misconfigured: standard engine cannot require a synchronized start"
        ))),
    }
}

/// Re-check the concurrency-sensitive preconditions with fresh reads from
/// storage. Runs inside the per-game lock: another start for an overlapping
/// batch may have committed between pre-lock validation and lock acquisition,
/// and the rosters captured in `ctx` would not show its stamps.
pub(crate) async fn revalidate_under_lock(
    store: &Arc<dyn GameStore>,
    ctx: &StartContext,
) -> Result<(), ServiceError> {
    let players = store.players_for_teams(ctx.team_ids()).await?;
    for team in &ctx.teams {
        if players
            .iter()
            .any(|player| player.team_id == team.team_id && player.session_started())
        {
            return Err(ServiceError::InvalidState(format!(
                "team `{}` already has an active or completed session",
                team.team_id
            )));
        }
    }

    if ctx.game.session_limit > 0 {
        // A session committed by the lock's previous holder starts after
        // ctx.now, so the count must use a fresh instant.
        let active = store
            .count_active_sessions(ctx.game.id, OffsetDateTime::now_utc())
            .await?;
        if active + ctx.teams.len() > ctx.game.session_limit {
            return Err(ServiceError::InvalidState(format!(
                "game `{}` session limit of {} reached ({} active)",
                ctx.game.id, ctx.game.session_limit, active
            )));
        }
    }

    Ok(())
}

/// Preconditions shared by every mode: game window, roster bounds, session
/// limit, and no team already mid-session. Elevated callers bypass the window,
/// roster-size, and late-start checks but never the already-started or
/// session-limit ones.
pub(crate) async fn validate_entry(
    store: &Arc<dyn GameStore>,
    ctx: &StartContext,
) -> Result<(), ServiceError> {
    let game = &ctx.game;

    if !ctx.actor.is_elevated {
        if ctx.now < game.game_start {
            return Err(ServiceError::InvalidState(format!(
                "game `{}` has not opened yet",
                game.id
            )));
        }
        if ctx.now >= game.game_end {
            return Err(ServiceError::InvalidState(format!(
                "game `{}` is already over",
                game.id
            )));
        }
        if !game.allow_late_start
            && ctx.now + time::Duration::minutes(game.session_minutes) > game.game_end
        {
            return Err(ServiceError::InvalidState(format!(
                "game `{}` does not allow late starts",
                game.id
            )));
        }
        for team in &ctx.teams {
            let size = team.players.len();
            if size < game.min_team_size || size > game.max_team_size {
                return Err(ServiceError::InvalidInput(format!(
                    "team `{}` has {} players; game `{}` requires between {} and {}",
                    team.team_id, size, game.id, game.min_team_size, game.max_team_size
                )));
            }
        }
    }

    for team in &ctx.teams {
        if team.players.iter().any(PlayerEntity::session_started) {
            return Err(ServiceError::InvalidState(format!(
                "team `{}` already has an active or completed session",
                team.team_id
            )));
        }
    }

    if game.session_limit > 0 {
        let active = store.count_active_sessions(game.id, ctx.now).await?;
        if active + ctx.teams.len() > game.session_limit {
            return Err(ServiceError::InvalidState(format!(
                "game `{}` session limit of {} reached ({} active)",
                game.id, game.session_limit, active
            )));
        }
    }

    Ok(())
}
