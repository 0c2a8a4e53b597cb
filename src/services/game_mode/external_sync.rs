use std::collections::HashSet;
use std::sync::Arc;

use futures::future::BoxFuture;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::dao::{
    game_store::GameStore,
    models::{ExternalDeployStatus, GameEngine, GamePlayState, TeamSessionResetType},
};
use crate::error::ServiceError;
use crate::services::game_mode::external::{
    aggregate_statuses, play_state_for_status, statuses_for_game,
};
use crate::services::game_mode::{GameModeService, StartContext, validate_entry};
use crate::services::sync_start::SyncStartGames;

/// Mode for externally hosted games where every team must launch together with
/// one shared window.
pub struct ExternalSyncGameModeService {
    store: Arc<dyn GameStore>,
    sync: Arc<dyn SyncStartGames>,
}

impl ExternalSyncGameModeService {
    /// Build the synchronized external mode over the given store and
    /// readiness aggregator.
    pub fn new(store: Arc<dyn GameStore>, sync: Arc<dyn SyncStartGames>) -> Self {
        Self { store, sync }
    }

    /// Distinct session windows currently stamped on the game's teams.
    ///
    /// A synchronized game must only ever show one; more than one means the
    /// launch is incomplete or the windows drifted after the synchronized
    /// write, which is an invariant violation worth alerting on.
    async fn distinct_team_windows(
        &self,
        game_id: Uuid,
    ) -> Result<HashSet<(OffsetDateTime, OffsetDateTime)>, ServiceError> {
        let players = self.store.players_for_game(game_id).await?;
        Ok(players
            .iter()
            .filter_map(|player| player.session_begin.zip(player.session_end))
            .collect())
    }
}

impl GameModeService for ExternalSyncGameModeService {
    fn deploy_resources_on_session_start(&self) -> bool {
        true
    }

    fn require_synchronized_sessions(&self) -> bool {
        true
    }

    fn start_fail_reset_type(&self) -> TeamSessionResetType {
        TeamSessionResetType::PreserveChallenges
    }

    fn game_play_state<'a>(
        &'a self,
        game_id: Uuid,
    ) -> BoxFuture<'a, Result<GamePlayState, ServiceError>> {
        Box::pin(async move {
            let game = self
                .store
                .find_game(game_id)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("game `{game_id}` not found")))?;
            if OffsetDateTime::now_utc() >= game.game_end {
                return Ok(GamePlayState::GameOver);
            }

            let statuses = statuses_for_game(&self.store, game_id).await?;
            let state = aggregate_statuses(&statuses);

            if state == GamePlayState::Started {
                let windows = self.distinct_team_windows(game_id).await?;
                if windows.len() > 1 {
                    tracing::warn!(
                        game_id = %game_id,
                        distinct_windows = windows.len(),
                        "session window drift detected on a synchronized game"
                    );
                    return Ok(GamePlayState::Starting);
                }
            }

            Ok(state)
        })
    }

    fn team_play_state<'a>(
        &'a self,
        team_id: Uuid,
    ) -> BoxFuture<'a, Result<GamePlayState, ServiceError>> {
        Box::pin(async move {
            let resources = self.store.resources_for_teams(vec![team_id]).await?;
            let resource = resources.first();
            let status = resource
                .map(|resource| resource.deploy_status)
                .unwrap_or(ExternalDeployStatus::NotStarted);
            let state = play_state_for_status(status);

            if state != GamePlayState::Started {
                return Ok(state);
            }

            // A deployed team whose players carry a window differing from the
            // one pushed to its resource record has not finished launching.
            let players = self.store.players_for_teams(vec![team_id]).await?;
            let player_window = players
                .iter()
                .find_map(|player| player.session_begin.zip(player.session_end));
            let resource_window =
                resource.and_then(|resource| resource.session_begin.zip(resource.session_end));

            if player_window != resource_window {
                tracing::warn!(
                    team_id = %team_id,
                    "team session window does not match its synchronized resource window"
                );
                return Ok(GamePlayState::Starting);
            }

            Ok(GamePlayState::Started)
        })
    }

    fn validate_start<'a>(
        &'a self,
        ctx: &'a StartContext,
    ) -> BoxFuture<'a, Result<(), ServiceError>> {
        Box::pin(async move {
            if ctx.game.engine != GameEngine::External {
                return Err(ServiceError::InvalidState(format!(
                    "game `{}` does not use the external engine",
                    ctx.game.id
                )));
            }
            if !ctx.game.require_synchronized_start {
                return Err(ServiceError::InvalidState(format!(
                    "game `{}` is not configured for synchronized play",
                    ctx.game.id
                )));
            }

            validate_entry(&self.store, ctx).await?;

            let state = self
                .sync
                .sync_state(ctx.game.id, ctx.team_ids())
                .await?;
            if !state.is_ready {
                let unready = state
                    .unready_teams()
                    .iter()
                    .map(Uuid::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(ServiceError::NotReady(unready));
            }

            if self.game_play_state(ctx.game.id).await? == GamePlayState::GameOver {
                return Err(ServiceError::InvalidState(format!(
                    "game `{}` is already over",
                    ctx.game.id
                )));
            }

            Ok(())
        })
    }

    fn clean_up_failed_deploy<'a>(
        &'a self,
        ctx: &'a StartContext,
        error: &'a ServiceError,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            tracing::warn!(
                game_id = %ctx.game.id,
                teams = ?ctx.team_ids(),
                error = %error,
                "synchronized launch failed; no team keeps its window"
            );
        })
    }
}
