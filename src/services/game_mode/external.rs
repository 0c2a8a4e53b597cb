use std::sync::Arc;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    game_store::GameStore,
    models::{ExternalDeployStatus, GameEngine, GamePlayState, TeamSessionResetType},
};
use crate::error::ServiceError;
use crate::services::game_mode::{GameModeService, StartContext, validate_entry};

/// Mode for games whose challenges run on externally provisioned resources,
/// with each team starting independently.
pub struct ExternalGameModeService {
    store: Arc<dyn GameStore>,
}

impl ExternalGameModeService {
    /// Build the external mode over the given store.
    pub fn new(store: Arc<dyn GameStore>) -> Self {
        Self { store }
    }
}

/// Map one team's deploy status onto a play state.
pub(crate) fn play_state_for_status(status: ExternalDeployStatus) -> GamePlayState {
    match status {
        // A failed deploy leaves the team where it began.
        ExternalDeployStatus::NotStarted | ExternalDeployStatus::Failed => {
            GamePlayState::NotStarted
        }
        ExternalDeployStatus::Deploying => GamePlayState::DeployingResources,
        ExternalDeployStatus::PartiallyDeployed => GamePlayState::Starting,
        ExternalDeployStatus::Deployed => GamePlayState::Started,
    }
}

/// Fold per-team deploy statuses into one game-level state.
pub(crate) fn aggregate_statuses(statuses: &[ExternalDeployStatus]) -> GamePlayState {
    if statuses.is_empty() {
        return GamePlayState::NotStarted;
    }
    if statuses
        .iter()
        .all(|status| *status == ExternalDeployStatus::Deployed)
    {
        return GamePlayState::Started;
    }
    if statuses
        .iter()
        .any(|status| *status == ExternalDeployStatus::Deploying)
    {
        return GamePlayState::DeployingResources;
    }
    if statuses.iter().any(|status| {
        matches!(
            status,
            ExternalDeployStatus::PartiallyDeployed | ExternalDeployStatus::Deployed
        )
    }) {
        return GamePlayState::Starting;
    }
    GamePlayState::NotStarted
}

/// Deploy statuses on record for every team of the game, absent records
/// reported as `NotStarted`.
pub(crate) async fn statuses_for_game(
    store: &Arc<dyn GameStore>,
    game_id: Uuid,
) -> Result<Vec<ExternalDeployStatus>, ServiceError> {
    let players = store.players_for_game(game_id).await?;
    let mut team_ids: Vec<Uuid> = players.iter().map(|player| player.team_id).collect();
    team_ids.sort_unstable();
    team_ids.dedup();

    let resources = store.resources_for_teams(team_ids.clone()).await?;
    Ok(team_ids
        .into_iter()
        .map(|team_id| {
            resources
                .iter()
                .find(|resource| resource.team_id == team_id)
                .map(|resource| resource.deploy_status)
                .unwrap_or(ExternalDeployStatus::NotStarted)
        })
        .collect())
}

impl GameModeService for ExternalGameModeService {
    fn deploy_resources_on_session_start(&self) -> bool {
        true
    }

    fn require_synchronized_sessions(&self) -> bool {
        false
    }

    fn start_fail_reset_type(&self) -> TeamSessionResetType {
        // The host owns teardown of partially provisioned resources; archiving
        // local challenge records would desynchronize from it.
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
            if time::OffsetDateTime::now_utc() >= game.game_end {
                return Ok(GamePlayState::GameOver);
            }

            let statuses = statuses_for_game(&self.store, game_id).await?;
            Ok(aggregate_statuses(&statuses))
        })
    }

    fn team_play_state<'a>(
        &'a self,
        team_id: Uuid,
    ) -> BoxFuture<'a, Result<GamePlayState, ServiceError>> {
        Box::pin(async move {
            let resources = self.store.resources_for_teams(vec![team_id]).await?;
            let status = resources
                .first()
                .map(|resource| resource.deploy_status)
                .unwrap_or(ExternalDeployStatus::NotStarted);
            Ok(play_state_for_status(status))
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

            validate_entry(&self.store, ctx).await
        })
    }

    fn clean_up_failed_deploy<'a>(
        &'a self,
        ctx: &'a StartContext,
        error: &'a ServiceError,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            // The host tears its own gamespaces down; surface the failure with
            // enough context for operators to chase orphaned resources.
            tracing::warn!(
                game_id = %ctx.game.id,
                teams = ?ctx.team_ids(),
                error = %error,
                "external deploy failed; host-side resources may still be tearing down"
            );
        })
    }
}
