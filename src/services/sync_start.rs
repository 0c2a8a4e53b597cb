//! Readiness aggregation for synchronized-start games: are all teams able to
//! begin together right now?

use std::sync::Arc;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{game_store::GameStore, models::ExternalDeployStatus};
use crate::error::ServiceError;

/// One team's contribution to the synchronized-start decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStartTeam {
    /// Team being aggregated.
    pub team_id: Uuid,
    /// Latest deploy status on record; `NotStarted` when no record exists.
    pub deploy_status: ExternalDeployStatus,
    /// Whether this team could start right now.
    pub is_ready: bool,
}

/// Aggregate readiness over a batch of teams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStartState {
    /// Game the aggregation was computed for.
    pub game_id: Uuid,
    /// True only when every team in the batch is ready.
    pub is_ready: bool,
    /// Per-team detail, in request order.
    pub teams: Vec<SyncStartTeam>,
}

impl SyncStartState {
    /// Teams currently blocking the synchronized start.
    pub fn unready_teams(&self) -> Vec<Uuid> {
        self.teams
            .iter()
            .filter(|team| !team.is_ready)
            .map(|team| team.team_id)
            .collect()
    }
}

/// Source of synchronized-start readiness. The production implementation reads
/// resource records from storage; tests substitute fixed views.
pub trait SyncStartGames: Send + Sync {
    /// Compute readiness for the listed teams of one game.
    fn sync_state(
        &self,
        game_id: Uuid,
        team_ids: Vec<Uuid>,
    ) -> BoxFuture<'static, Result<SyncStartState, ServiceError>>;
}

/// Store-backed [`SyncStartGames`]: a team is ready once the external host has
/// reported its resources fully deployed.
pub struct SyncStartService {
    store: Arc<dyn GameStore>,
}

impl SyncStartService {
    /// Build an aggregator over the given store.
    pub fn new(store: Arc<dyn GameStore>) -> Self {
        Self { store }
    }
}

impl SyncStartGames for SyncStartService {
    fn sync_state(
        &self,
        game_id: Uuid,
        team_ids: Vec<Uuid>,
    ) -> BoxFuture<'static, Result<SyncStartState, ServiceError>> {
        let store = self.store.clone();
        Box::pin(async move {
            let resources = store.resources_for_teams(team_ids.clone()).await?;

            let teams: Vec<SyncStartTeam> = team_ids
                .into_iter()
                .map(|team_id| {
                    let deploy_status = resources
                        .iter()
                        .find(|resource| resource.team_id == team_id)
                        .map(|resource| resource.deploy_status)
                        .unwrap_or(ExternalDeployStatus::NotStarted);
                    SyncStartTeam {
                        team_id,
                        deploy_status,
                        is_ready: deploy_status == ExternalDeployStatus::Deployed,
                    }
                })
                .collect();

            let is_ready = !teams.is_empty() && teams.iter().all(|team| team.is_ready);

            Ok(SyncStartState {
                game_id,
                is_ready,
                teams,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::dao::game_store::memory::MemoryStore;
    use crate::dao::models::ExternalResourceEntity;

    use super::*;

    fn resource(
        game_id: Uuid,
        team_id: Uuid,
        deploy_status: ExternalDeployStatus,
    ) -> ExternalResourceEntity {
        ExternalResourceEntity {
            team_id,
            game_id,
            deploy_status,
            session_begin: None,
            session_end: None,
        }
    }

    #[tokio::test]
    async fn all_deployed_teams_are_ready() {
        let store = Arc::new(MemoryStore::new());
        let game_id = Uuid::new_v4();
        let teams = vec![Uuid::new_v4(), Uuid::new_v4()];
        for team_id in &teams {
            store
                .save_resource(resource(game_id, *team_id, ExternalDeployStatus::Deployed))
                .await
                .unwrap();
        }

        let aggregator = SyncStartService::new(store);
        let state = aggregator.sync_state(game_id, teams).await.unwrap();
        assert!(state.is_ready);
        assert!(state.unready_teams().is_empty());
    }

    #[tokio::test]
    async fn one_deploying_team_blocks_the_batch() {
        let store = Arc::new(MemoryStore::new());
        let game_id = Uuid::new_v4();
        let ready = Uuid::new_v4();
        let lagging = Uuid::new_v4();
        store
            .save_resource(resource(game_id, ready, ExternalDeployStatus::Deployed))
            .await
            .unwrap();
        store
            .save_resource(resource(game_id, lagging, ExternalDeployStatus::Deploying))
            .await
            .unwrap();

        let aggregator = SyncStartService::new(store);
        let state = aggregator
            .sync_state(game_id, vec![ready, lagging])
            .await
            .unwrap();
        assert!(!state.is_ready);
        assert_eq!(state.unready_teams(), vec![lagging]);
    }

    #[tokio::test]
    async fn missing_resource_record_counts_as_not_started() {
        let store = Arc::new(MemoryStore::new());
        let game_id = Uuid::new_v4();
        let team_id = Uuid::new_v4();

        let aggregator = SyncStartService::new(store);
        let state = aggregator.sync_state(game_id, vec![team_id]).await.unwrap();
        assert!(!state.is_ready);
        assert_eq!(
            state.teams[0].deploy_status,
            ExternalDeployStatus::NotStarted
        );
    }
}
