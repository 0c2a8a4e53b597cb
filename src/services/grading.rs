//! Challenge grading: records a solve against a team's challenge instance.
//!
//! Grading serializes on a per-challenge named lock so two submissions for the
//! same instance can never both read the pre-solve state and double-award.

use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::dao::models::ChallengeEntity;
use crate::error::ServiceError;
use crate::state::SharedState;

/// Bonus applied on top of base points for the earliest full solves of a
/// challenge spec, in percent, ordered by solve rank.
const FIRST_SOLVE_BONUS_PERCENT: [i32; 3] = [10, 5, 3];

/// Record a full solve for the given challenge instance.
///
/// The solve is awarded the challenge's base points plus a rank bonus when the
/// team is among the first across all teams to solve the same spec. Returns the
/// updated challenge record.
pub async fn score_submission(
    state: &SharedState,
    challenge_id: Uuid,
    now: OffsetDateTime,
) -> Result<ChallengeEntity, ServiceError> {
    let store = state.require_game_store().await?;

    let lock_key = format!("challenge:{challenge_id}");
    let _guard = state
        .locks()
        .acquire_timeout(&lock_key, state.config().lock_timeout)
        .await
        .ok_or(ServiceError::Timeout)?;

    let mut challenge = store
        .find_challenge(challenge_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("challenge `{challenge_id}` not found")))?;

    if challenge.solved_at.is_some() {
        return Err(ServiceError::InvalidState(format!(
            "challenge `{challenge_id}` is already solved"
        )));
    }
    if challenge.ended_at.is_some() {
        return Err(ServiceError::InvalidState(format!(
            "challenge `{challenge_id}` is closed"
        )));
    }

    let players = store.players_for_teams(vec![challenge.team_id]).await?;
    let in_session = players.iter().any(|player| {
        player
            .session_begin
            .zip(player.session_end)
            .is_some_and(|(begin, end)| begin <= now && now < end)
    });
    if !in_session {
        return Err(ServiceError::InvalidState(format!(
            "team `{}` has no active session",
            challenge.team_id
        )));
    }

    let solve_rank = store.solved_count_for_spec(challenge.spec_id).await?;
    let bonus_percent = FIRST_SOLVE_BONUS_PERCENT
        .get(solve_rank)
        .copied()
        .unwrap_or(0);

    challenge.score = challenge.points + challenge.points * bonus_percent / 100;
    challenge.solved_at = Some(now);
    challenge.ended_at = Some(now);
    store.save_challenge(challenge.clone()).await?;

    info!(
        challenge_id = %challenge_id,
        team_id = %challenge.team_id,
        score = challenge.score,
        solve_rank,
        "challenge solved"
    );

    Ok(challenge)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use time::Duration;

    use crate::config::AppConfig;
    use crate::dao::game_store::{GameStore, memory::MemoryStore};
    use crate::dao::models::{PlayerEntity, PlayerRole};
    use crate::host::{DeployResult, GameHost, HostResult};
    use crate::state::AppState;

    use super::*;

    struct NullHost;

    impl GameHost for NullHost {
        fn deploy(
            &self,
            _game_id: Uuid,
            team_id: Uuid,
        ) -> futures::future::BoxFuture<'static, HostResult<DeployResult>> {
            Box::pin(async move {
                Ok(DeployResult {
                    team_id,
                    status: crate::dao::models::ExternalDeployStatus::Deployed,
                })
            })
        }

        fn start_game(
            &self,
            _game_id: Uuid,
            _team_ids: Vec<Uuid>,
            _window: crate::dao::models::SessionStamp,
        ) -> futures::future::BoxFuture<'static, HostResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn ping(&self) -> futures::future::BoxFuture<'static, HostResult<()>> {
            Box::pin(async { Ok(()) })
        }
    }

    async fn state_with_store() -> (crate::state::SharedState, Arc<dyn GameStore>) {
        let state = AppState::new(AppConfig::default(), Arc::new(NullHost));
        let store: Arc<dyn GameStore> = Arc::new(MemoryStore::new());
        state.install_game_store(store.clone()).await;
        (state, store)
    }

    async fn seed_started_team(store: &Arc<dyn GameStore>, now: OffsetDateTime) -> (Uuid, Uuid) {
        let team_id = Uuid::new_v4();
        let game_id = Uuid::new_v4();
        store
            .save_player(PlayerEntity {
                id: Uuid::new_v4(),
                team_id,
                game_id,
                name: "sam".into(),
                role: PlayerRole::Captain,
                session_begin: Some(now - Duration::minutes(5)),
                session_end: Some(now + Duration::minutes(55)),
                session_minutes: 60,
                is_late_start: false,
            })
            .await
            .unwrap();
        (team_id, game_id)
    }

    fn open_challenge(spec_id: Uuid, team_id: Uuid, game_id: Uuid, now: OffsetDateTime) -> ChallengeEntity {
        ChallengeEntity {
            id: Uuid::new_v4(),
            spec_id,
            team_id,
            game_id,
            points: 200,
            score: 0,
            started_at: now,
            ended_at: None,
            solved_at: None,
        }
    }

    #[tokio::test]
    async fn first_solve_earns_the_top_bonus() {
        let now = OffsetDateTime::now_utc();
        let (state, store) = state_with_store().await;
        let (team_id, game_id) = seed_started_team(&store, now).await;
        let challenge = open_challenge(Uuid::new_v4(), team_id, game_id, now);
        store.save_challenge(challenge.clone()).await.unwrap();

        let solved = score_submission(&state, challenge.id, now).await.unwrap();

        assert_eq!(solved.score, 220);
        assert_eq!(solved.solved_at, Some(now));
        assert_eq!(solved.ended_at, Some(now));
    }

    #[tokio::test]
    async fn later_solves_fall_back_to_base_points() {
        let now = OffsetDateTime::now_utc();
        let (state, store) = state_with_store().await;
        let spec_id = Uuid::new_v4();

        // Three teams already solved this spec.
        for _ in 0..3 {
            let (team_id, game_id) = seed_started_team(&store, now).await;
            let mut earlier = open_challenge(spec_id, team_id, game_id, now);
            earlier.solved_at = Some(now - Duration::minutes(10));
            earlier.ended_at = Some(now - Duration::minutes(10));
            store.save_challenge(earlier).await.unwrap();
        }

        let (team_id, game_id) = seed_started_team(&store, now).await;
        let challenge = open_challenge(spec_id, team_id, game_id, now);
        store.save_challenge(challenge.clone()).await.unwrap();

        let solved = score_submission(&state, challenge.id, now).await.unwrap();
        assert_eq!(solved.score, 200);
    }

    #[tokio::test]
    async fn double_submission_is_rejected() {
        let now = OffsetDateTime::now_utc();
        let (state, store) = state_with_store().await;
        let (team_id, game_id) = seed_started_team(&store, now).await;
        let challenge = open_challenge(Uuid::new_v4(), team_id, game_id, now);
        store.save_challenge(challenge.clone()).await.unwrap();

        score_submission(&state, challenge.id, now).await.unwrap();
        let err = score_submission(&state, challenge.id, now).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn solve_outside_the_session_window_is_rejected() {
        let now = OffsetDateTime::now_utc();
        let (state, store) = state_with_store().await;
        let team_id = Uuid::new_v4();
        let game_id = Uuid::new_v4();
        store
            .save_player(PlayerEntity {
                id: Uuid::new_v4(),
                team_id,
                game_id,
                name: "late".into(),
                role: PlayerRole::Member,
                session_begin: Some(now - Duration::hours(2)),
                session_end: Some(now - Duration::hours(1)),
                session_minutes: 60,
                is_late_start: false,
            })
            .await
            .unwrap();
        let challenge = open_challenge(Uuid::new_v4(), team_id, game_id, now);
        store.save_challenge(challenge.clone()).await.unwrap();

        let err = score_submission(&state, challenge.id, now).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }
}
