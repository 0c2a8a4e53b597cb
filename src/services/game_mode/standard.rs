use std::sync::Arc;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    game_store::GameStore,
    models::{GameEngine, GamePlayState, TeamSessionResetType},
};
use crate::error::ServiceError;
use crate::services::game_mode::{GameModeService, StartContext, validate_entry};

/// Mode for games played entirely inside this application. No external
/// resources; play state falls out of session timestamps alone.
pub struct StandardGameModeService {
    store: Arc<dyn GameStore>,
}

impl StandardGameModeService {
    /// Build the standard mode over the given store.
    pub fn new(store: Arc<dyn GameStore>) -> Self {
        Self { store }
    }
}

impl GameModeService for StandardGameModeService {
    fn deploy_resources_on_session_start(&self) -> bool {
        false
    }

    fn require_synchronized_sessions(&self) -> bool {
        false
    }

    fn start_fail_reset_type(&self) -> TeamSessionResetType {
        TeamSessionResetType::ArchiveChallenges
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
            let now = time::OffsetDateTime::now_utc();

            if now >= game.game_end {
                return Ok(GamePlayState::GameOver);
            }

            let players = self.store.players_for_game(game_id).await?;
            let mut any_session = false;
            for player in &players {
                if let (Some(begin), Some(end)) = (player.session_begin, player.session_end) {
                    any_session = true;
                    if begin <= now && now < end {
                        return Ok(GamePlayState::Started);
                    }
                }
            }

            if any_session {
                Ok(GamePlayState::GameOver)
            } else {
                Ok(GamePlayState::NotStarted)
            }
        })
    }

    fn team_play_state<'a>(
        &'a self,
        team_id: Uuid,
    ) -> BoxFuture<'a, Result<GamePlayState, ServiceError>> {
        Box::pin(async move {
            let players = self.store.players_for_teams(vec![team_id]).await?;
            if players.is_empty() {
                return Err(ServiceError::NotFound(format!("team `{team_id}` not found")));
            }
            let now = time::OffsetDateTime::now_utc();

            let window = players
                .iter()
                .find_map(|player| player.session_begin.zip(player.session_end));

            Ok(match window {
                None => GamePlayState::NotStarted,
                Some((begin, end)) if begin <= now && now < end => GamePlayState::Started,
                Some(_) => GamePlayState::GameOver,
            })
        })
    }

    fn validate_start<'a>(
        &'a self,
        ctx: &'a StartContext,
    ) -> BoxFuture<'a, Result<(), ServiceError>> {
        Box::pin(async move {
            if ctx.game.engine != GameEngine::Standard {
                return Err(ServiceError::InvalidState(format!(
                    "game `{}` does not use the standard engine",
                    ctx.game.id
                )));
            }

            validate_entry(&self.store, ctx).await
        })
    }

    fn clean_up_failed_deploy<'a>(
        &'a self,
        ctx: &'a StartContext,
        error: &'a ServiceError,
    ) -> BoxFuture<'a, ()> {
        // Nothing was deployed; record the failure for operators.
        Box::pin(async move {
            tracing::warn!(
                game_id = %ctx.game.id,
                error = %error,
                "standard mode start failed before commit"
            );
        })
    }
}
