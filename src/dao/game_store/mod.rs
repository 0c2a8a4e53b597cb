/// In-memory store backend.
pub mod memory;

use futures::future::BoxFuture;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::dao::models::{
    ChallengeEntity, ExternalResourceEntity, GameEntity, PlayerEntity, SessionStamp,
};
use crate::dao::storage::StorageResult;

/// Abstraction over the persistence layer for games, enrollments, external
/// resource records, and challenges. Queried by simple predicates only; the
/// backing database is an external concern.
pub trait GameStore: Send + Sync {
    /// Look up a game by id.
    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    /// Insert or replace a game.
    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// All enrollments whose team id is in `team_ids`.
    fn players_for_teams(
        &self,
        team_ids: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>>;
    /// All enrollments for one game.
    fn players_for_game(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>>;
    /// Insert or replace an enrollment.
    fn save_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Write session fields for every player on every listed team in one bulk
    /// update so a half-written batch is never observable.
    fn stamp_sessions(
        &self,
        team_ids: Vec<Uuid>,
        stamp: SessionStamp,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Clear session fields for every player on every listed team.
    fn clear_sessions(&self, team_ids: Vec<Uuid>) -> BoxFuture<'static, StorageResult<()>>;
    /// Number of distinct teams in the game with a session still running at `now`.
    fn count_active_sessions(
        &self,
        game_id: Uuid,
        now: OffsetDateTime,
    ) -> BoxFuture<'static, StorageResult<usize>>;
    /// External resource records for the listed teams. Absent records mean no
    /// deployment was ever requested.
    fn resources_for_teams(
        &self,
        team_ids: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<Vec<ExternalResourceEntity>>>;
    /// Insert or replace an external resource record.
    fn save_resource(
        &self,
        resource: ExternalResourceEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Push one shared window onto every listed team's resource record.
    fn stamp_resource_windows(
        &self,
        team_ids: Vec<Uuid>,
        stamp: SessionStamp,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Challenge instances owned by one team.
    fn challenges_for_team(
        &self,
        team_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ChallengeEntity>>>;
    /// Look up a challenge instance by id.
    fn find_challenge(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ChallengeEntity>>>;
    /// Insert or replace a challenge instance.
    fn save_challenge(&self, challenge: ChallengeEntity)
    -> BoxFuture<'static, StorageResult<()>>;
    /// Mark every open challenge of the team as ended at `now`.
    fn archive_challenges(
        &self,
        team_id: Uuid,
        now: OffsetDateTime,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Delete every enrollment belonging to the team.
    fn remove_enrollments(&self, team_id: Uuid) -> BoxFuture<'static, StorageResult<()>>;
    /// How many teams have fully solved the given challenge spec.
    fn solved_count_for_spec(&self, spec_id: Uuid) -> BoxFuture<'static, StorageResult<usize>>;
    /// Cheap connectivity probe used by the storage supervisor.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
