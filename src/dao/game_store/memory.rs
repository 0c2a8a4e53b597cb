use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::dao::game_store::GameStore;
use crate::dao::models::{
    ChallengeEntity, ExternalResourceEntity, GameEntity, PlayerEntity, SessionStamp,
};
use crate::dao::storage::StorageResult;

/// In-memory [`GameStore`] backed by concurrent maps. The canonical backend in
/// tests and the fallback when no external database is configured.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Tables>,
}

#[derive(Default)]
struct Tables {
    games: DashMap<Uuid, GameEntity>,
    players: DashMap<Uuid, PlayerEntity>,
    resources: DashMap<Uuid, ExternalResourceEntity>,
    challenges: DashMap<Uuid, ChallengeEntity>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl GameStore for MemoryStore {
    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let tables = self.inner.clone();
        Box::pin(async move { Ok(tables.games.get(&id).map(|entry| entry.clone())) })
    }

    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let tables = self.inner.clone();
        Box::pin(async move {
            tables.games.insert(game.id, game);
            Ok(())
        })
    }

    fn players_for_teams(
        &self,
        team_ids: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let tables = self.inner.clone();
        Box::pin(async move {
            Ok(tables
                .players
                .iter()
                .filter(|entry| team_ids.contains(&entry.team_id))
                .map(|entry| entry.clone())
                .collect())
        })
    }

    fn players_for_game(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let tables = self.inner.clone();
        Box::pin(async move {
            Ok(tables
                .players
                .iter()
                .filter(|entry| entry.game_id == game_id)
                .map(|entry| entry.clone())
                .collect())
        })
    }

    fn save_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>> {
        let tables = self.inner.clone();
        Box::pin(async move {
            tables.players.insert(player.id, player);
            Ok(())
        })
    }

    fn stamp_sessions(
        &self,
        team_ids: Vec<Uuid>,
        stamp: SessionStamp,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let tables = self.inner.clone();
        Box::pin(async move {
            for mut entry in tables.players.iter_mut() {
                if team_ids.contains(&entry.team_id) {
                    entry.session_begin = Some(stamp.begin);
                    entry.session_end = Some(stamp.end);
                    entry.session_minutes = stamp.length_minutes;
                    entry.is_late_start = stamp.is_late_start;
                }
            }
            Ok(())
        })
    }

    fn clear_sessions(&self, team_ids: Vec<Uuid>) -> BoxFuture<'static, StorageResult<()>> {
        let tables = self.inner.clone();
        Box::pin(async move {
            for mut entry in tables.players.iter_mut() {
                if team_ids.contains(&entry.team_id) {
                    entry.session_begin = None;
                    entry.session_end = None;
                    entry.session_minutes = 0;
                    entry.is_late_start = false;
                }
            }
            Ok(())
        })
    }

    fn count_active_sessions(
        &self,
        game_id: Uuid,
        now: OffsetDateTime,
    ) -> BoxFuture<'static, StorageResult<usize>> {
        let tables = self.inner.clone();
        Box::pin(async move {
            let mut teams = std::collections::HashSet::new();
            for entry in tables.players.iter() {
                if entry.game_id != game_id {
                    continue;
                }
                let active = matches!(
                    (entry.session_begin, entry.session_end),
                    (Some(begin), Some(end)) if begin <= now && now < end
                );
                if active {
                    teams.insert(entry.team_id);
                }
            }
            Ok(teams.len())
        })
    }

    fn resources_for_teams(
        &self,
        team_ids: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<Vec<ExternalResourceEntity>>> {
        let tables = self.inner.clone();
        Box::pin(async move {
            Ok(team_ids
                .iter()
                .filter_map(|team_id| tables.resources.get(team_id).map(|entry| entry.clone()))
                .collect())
        })
    }

    fn save_resource(
        &self,
        resource: ExternalResourceEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let tables = self.inner.clone();
        Box::pin(async move {
            tables.resources.insert(resource.team_id, resource);
            Ok(())
        })
    }

    fn stamp_resource_windows(
        &self,
        team_ids: Vec<Uuid>,
        stamp: SessionStamp,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let tables = self.inner.clone();
        Box::pin(async move {
            for team_id in team_ids {
                if let Some(mut entry) = tables.resources.get_mut(&team_id) {
                    entry.session_begin = Some(stamp.begin);
                    entry.session_end = Some(stamp.end);
                }
            }
            Ok(())
        })
    }

    fn challenges_for_team(
        &self,
        team_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ChallengeEntity>>> {
        let tables = self.inner.clone();
        Box::pin(async move {
            Ok(tables
                .challenges
                .iter()
                .filter(|entry| entry.team_id == team_id)
                .map(|entry| entry.clone())
                .collect())
        })
    }

    fn find_challenge(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ChallengeEntity>>> {
        let tables = self.inner.clone();
        Box::pin(async move { Ok(tables.challenges.get(&id).map(|entry| entry.clone())) })
    }

    fn save_challenge(
        &self,
        challenge: ChallengeEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let tables = self.inner.clone();
        Box::pin(async move {
            tables.challenges.insert(challenge.id, challenge);
            Ok(())
        })
    }

    fn archive_challenges(
        &self,
        team_id: Uuid,
        now: OffsetDateTime,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let tables = self.inner.clone();
        Box::pin(async move {
            for mut entry in tables.challenges.iter_mut() {
                if entry.team_id == team_id && entry.ended_at.is_none() {
                    entry.ended_at = Some(now);
                }
            }
            Ok(())
        })
    }

    fn remove_enrollments(&self, team_id: Uuid) -> BoxFuture<'static, StorageResult<()>> {
        let tables = self.inner.clone();
        Box::pin(async move {
            tables.players.retain(|_, player| player.team_id != team_id);
            Ok(())
        })
    }

    fn solved_count_for_spec(&self, spec_id: Uuid) -> BoxFuture<'static, StorageResult<usize>> {
        let tables = self.inner.clone();
        Box::pin(async move {
            Ok(tables
                .challenges
                .iter()
                .filter(|entry| entry.spec_id == spec_id && entry.solved_at.is_some())
                .count())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
