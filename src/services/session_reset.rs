//! Compensating resets applied to teams when a start attempt fails partway.

use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{error, info};
use uuid::Uuid;

use crate::dao::{game_store::GameStore, models::TeamSessionResetType};
use crate::error::ServiceError;

/// Reset one team's session according to `reset_type`.
///
/// - `ArchiveChallenges`: close out active challenge records and clear the
///   team's session timestamps; roster membership is kept.
/// - `PreserveChallenges`: clear session timestamps only. Used when an
///   external system may still be mid-provision and touching local challenge
///   records would desynchronize from it.
/// - `UnenrollAndArchiveChallenges`: archive challenge records and remove the
///   team's roster entries entirely.
pub async fn reset_team(
    store: &Arc<dyn GameStore>,
    team_id: Uuid,
    reset_type: TeamSessionResetType,
    actor_id: &str,
    now: OffsetDateTime,
) -> Result<(), ServiceError> {
    match reset_type {
        TeamSessionResetType::ArchiveChallenges => {
            store.archive_challenges(team_id, now).await?;
            store.clear_sessions(vec![team_id]).await?;
        }
        TeamSessionResetType::PreserveChallenges => {
            store.clear_sessions(vec![team_id]).await?;
        }
        TeamSessionResetType::UnenrollAndArchiveChallenges => {
            store.archive_challenges(team_id, now).await?;
            store.clear_sessions(vec![team_id]).await?;
            store.remove_enrollments(team_id).await?;
        }
    }

    info!(team_id = %team_id, reset = ?reset_type, actor = actor_id, "team session reset");
    Ok(())
}

/// Reset every listed team, best effort. A failure on one team never prevents
/// attempting the rest; failures are logged and collected for the caller.
pub async fn reset_teams(
    store: &Arc<dyn GameStore>,
    team_ids: &[Uuid],
    reset_type: TeamSessionResetType,
    actor_id: &str,
    now: OffsetDateTime,
) -> Vec<(Uuid, ServiceError)> {
    let mut failures = Vec::new();

    for &team_id in team_ids {
        if let Err(err) = reset_team(store, team_id, reset_type, actor_id, now).await {
            error!(team_id = %team_id, error = %err, "failed to reset team session");
            failures.push((team_id, err));
        }
    }

    failures
}

#[cfg(test)]
mod tests {
    use time::Duration;
    use uuid::Uuid;

    use crate::dao::game_store::memory::MemoryStore;
    use crate::dao::models::{ChallengeEntity, PlayerEntity, PlayerRole};

    use super::*;

    fn player(team_id: Uuid, game_id: Uuid, started_at: OffsetDateTime) -> PlayerEntity {
        PlayerEntity {
            id: Uuid::new_v4(),
            team_id,
            game_id,
            name: "pat".into(),
            role: PlayerRole::Captain,
            session_begin: Some(started_at),
            session_end: Some(started_at + Duration::minutes(60)),
            session_minutes: 60,
            is_late_start: false,
        }
    }

    fn challenge(team_id: Uuid, game_id: Uuid, started_at: OffsetDateTime) -> ChallengeEntity {
        ChallengeEntity {
            id: Uuid::new_v4(),
            spec_id: Uuid::new_v4(),
            team_id,
            game_id,
            points: 100,
            score: 40,
            started_at,
            ended_at: None,
            solved_at: None,
        }
    }

    async fn store_with_started_team(
        now: OffsetDateTime,
    ) -> (Arc<dyn GameStore>, Uuid) {
        let store: Arc<dyn GameStore> = Arc::new(MemoryStore::new());
        let team_id = Uuid::new_v4();
        let game_id = Uuid::new_v4();
        store.save_player(player(team_id, game_id, now)).await.unwrap();
        store
            .save_challenge(challenge(team_id, game_id, now))
            .await
            .unwrap();
        (store, team_id)
    }

    #[tokio::test]
    async fn archive_reset_clears_sessions_and_ends_challenges() {
        let now = OffsetDateTime::now_utc();
        let (store, team_id) = store_with_started_team(now).await;

        reset_team(&store, team_id, TeamSessionResetType::ArchiveChallenges, "t", now)
            .await
            .unwrap();

        let players = store.players_for_teams(vec![team_id]).await.unwrap();
        assert!(players.iter().all(|p| !p.session_started()));
        let challenges = store.challenges_for_team(team_id).await.unwrap();
        assert!(challenges.iter().all(|c| c.ended_at.is_some()));
    }

    #[tokio::test]
    async fn preserve_reset_leaves_challenges_open() {
        let now = OffsetDateTime::now_utc();
        let (store, team_id) = store_with_started_team(now).await;

        reset_team(&store, team_id, TeamSessionResetType::PreserveChallenges, "t", now)
            .await
            .unwrap();

        let players = store.players_for_teams(vec![team_id]).await.unwrap();
        assert!(players.iter().all(|p| !p.session_started()));
        let challenges = store.challenges_for_team(team_id).await.unwrap();
        assert!(challenges.iter().all(|c| c.ended_at.is_none()));
    }

    #[tokio::test]
    async fn unenroll_reset_removes_the_roster() {
        let now = OffsetDateTime::now_utc();
        let (store, team_id) = store_with_started_team(now).await;

        reset_team(
            &store,
            team_id,
            TeamSessionResetType::UnenrollAndArchiveChallenges,
            "t",
            now,
        )
        .await
        .unwrap();

        let players = store.players_for_teams(vec![team_id]).await.unwrap();
        assert!(players.is_empty());
        let challenges = store.challenges_for_team(team_id).await.unwrap();
        assert!(challenges.iter().all(|c| c.ended_at.is_some()));
    }

    #[tokio::test]
    async fn batch_reset_attempts_every_team() {
        let now = OffsetDateTime::now_utc();
        let (store, first) = store_with_started_team(now).await;
        let second = Uuid::new_v4();
        let game_id = Uuid::new_v4();
        store.save_player(player(second, game_id, now)).await.unwrap();

        let failures = reset_teams(
            &store,
            &[first, second],
            TeamSessionResetType::PreserveChallenges,
            "t",
            now,
        )
        .await;

        assert!(failures.is_empty());
        for team_id in [first, second] {
            let players = store.players_for_teams(vec![team_id]).await.unwrap();
            assert!(players.iter().all(|p| !p.session_started()));
        }
    }
}
