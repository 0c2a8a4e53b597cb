//! Start orchestration: moves one or more teams of a single game from "not
//! started" to "actively playing".
//!
//! The sequence is lock, deploy, commit, notify; any failure inside the
//! critical section is compensated by per-team resets after the lock has been
//! released. Validation runs before the lock so rejected requests have no side
//! effects to undo.

use std::sync::Arc;

use indexmap::IndexMap;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

use crate::dao::{
    game_store::GameStore,
    models::{ExternalResourceEntity, GameEngine, GamePlayState, PlayerRole},
};
use crate::dto::sessions::{
    Actor, PlayerSummary, StartSessionsRequest, StartSessionsResponse, TeamStartSummary,
};
use crate::error::ServiceError;
use crate::services::game_mode::{self, GameModeService, StartContext, TeamRoster};
use crate::services::sync_start::{SyncStartGames, SyncStartService};
use crate::services::{events, session_reset, session_window};
use crate::state::SharedState;

/// Start play sessions for every team in the request.
///
/// Returns `Ok(Some(response))` on success, `Err` for validation failures
/// (nothing was mutated), and `Ok(None)` when the start failed mid-flight and
/// was rolled back, a handled and terminal outcome rather than a crash.
pub async fn start_team_sessions(
    state: &SharedState,
    actor: Actor,
    request: StartSessionsRequest,
    cancel: CancellationToken,
) -> Result<Option<StartSessionsResponse>, ServiceError> {
    let team_ids = request.team_ids;
    if team_ids.is_empty() {
        return Err(ServiceError::InvalidInput(
            "at least one team id is required".into(),
        ));
    }

    // Checked once, before the lock or any external call. Past this point the
    // operation runs to completion or failure; partial external deploys cannot
    // safely be abandoned mid-flight.
    if cancel.is_cancelled() {
        return Err(ServiceError::Cancelled);
    }

    let store = state.require_game_store().await?;
    let (game_id, teams) = resolve_single_game(&store, &team_ids).await?;

    let game = store
        .find_game(game_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game `{game_id}` not found")))?;

    let sync: Arc<dyn SyncStartGames> = Arc::new(SyncStartService::new(store.clone()));
    let mode = game_mode::for_game(store.clone(), sync, game_id).await?;

    let ctx = StartContext {
        game,
        teams,
        actor,
        now: OffsetDateTime::now_utc(),
    };

    mode.validate_start(&ctx).await?;

    let lock_key = format!("game:{game_id}");
    let guard = state
        .locks()
        .acquire_timeout(&lock_key, state.config().lock_timeout)
        .await
        .ok_or(ServiceError::Timeout)?;

    // The lock's previous holder may have stamped an overlapping batch while
    // this request was validating or waiting. Re-check with fresh reads and
    // reject as plain validation failure: nothing was mutated, so the
    // compensation path (which would reset the committed sessions) must not
    // run.
    if let Err(err) = game_mode::revalidate_under_lock(&store, &ctx).await {
        drop(guard);
        return Err(err);
    }

    let outcome = run_locked(state, &store, mode.as_ref(), &ctx).await;

    // Compensation happens outside the critical section so resets can touch
    // game-scoped resources without self-deadlocking.
    drop(guard);

    match outcome {
        Ok(response) => {
            info!(game_id = %game_id, teams = ?ctx.team_ids(), "team sessions started");
            events::broadcast_launch_ended(state, game_id, &ctx.team_ids(), &ctx.actor.id);
            Ok(Some(response))
        }
        Err(err) => {
            error!(game_id = %game_id, error = %err, "session start failed; compensating");
            mode.clean_up_failed_deploy(&ctx, &err).await;
            let failures = session_reset::reset_teams(
                &store,
                &ctx.team_ids(),
                mode.start_fail_reset_type(),
                &ctx.actor.id,
                ctx.now,
            )
            .await;
            if !failures.is_empty() {
                error!(
                    game_id = %game_id,
                    failed_teams = ?failures.iter().map(|(id, _)| *id).collect::<Vec<_>>(),
                    "some compensating resets failed"
                );
            }
            events::broadcast_launch_failed(
                state,
                game_id,
                &ctx.team_ids(),
                &ctx.actor.id,
                &err.to_string(),
            );
            Ok(None)
        }
    }
}

/// Derive one game's aggregate play state through its mode service. Read only.
pub async fn game_play_state(
    state: &SharedState,
    game_id: Uuid,
) -> Result<GamePlayState, ServiceError> {
    let store = state.require_game_store().await?;
    let sync: Arc<dyn SyncStartGames> = Arc::new(SyncStartService::new(store.clone()));
    let mode = game_mode::for_game(store, sync, game_id).await?;
    mode.game_play_state(game_id).await
}

/// Resolve the requested teams' rosters and require them all to belong to
/// exactly one game. Fails before any side effect otherwise.
async fn resolve_single_game(
    store: &Arc<dyn GameStore>,
    team_ids: &[Uuid],
) -> Result<(Uuid, Vec<TeamRoster>), ServiceError> {
    let players = store.players_for_teams(team_ids.to_vec()).await?;

    let mut teams: Vec<TeamRoster> = team_ids
        .iter()
        .map(|&team_id| TeamRoster {
            team_id,
            players: Vec::new(),
        })
        .collect();
    for player in players {
        if let Some(team) = teams.iter_mut().find(|team| team.team_id == player.team_id) {
            team.players.push(player);
        }
    }

    let missing: Vec<String> = teams
        .iter()
        .filter(|team| team.players.is_empty())
        .map(|team| team.team_id.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ServiceError::NotFound(format!(
            "teams not found: {}",
            missing.join(", ")
        )));
    }

    let mut game_ids: Vec<Uuid> = teams
        .iter()
        .flat_map(|team| team.players.iter().map(|player| player.game_id))
        .collect();
    game_ids.sort_unstable();
    game_ids.dedup();

    match game_ids.as_slice() {
        [game_id] => Ok((*game_id, teams)),
        found => Err(ServiceError::InvalidInput(format!(
            "requested teams span {} games ({}); a start batch must target exactly one",
            found.len(),
            found
                .iter()
                .map(Uuid::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        ))),
    }
}

/// The critical section: everything here runs under the per-game lock.
async fn run_locked(
    state: &SharedState,
    store: &Arc<dyn GameStore>,
    mode: &dyn GameModeService,
    ctx: &StartContext,
) -> Result<StartSessionsResponse, ServiceError> {
    let team_ids = ctx.team_ids();
    events::broadcast_launch_started(state, ctx.game.id, &team_ids, &ctx.actor.id);

    if mode.deploy_resources_on_session_start() {
        let host = state.host();
        // Sequential per team; the host may parallelize internally.
        for team in &ctx.teams {
            let result = host.deploy(ctx.game.id, team.team_id).await?;
            store
                .save_resource(ExternalResourceEntity {
                    team_id: team.team_id,
                    game_id: ctx.game.id,
                    deploy_status: result.status,
                    session_begin: None,
                    session_end: None,
                })
                .await?;
        }
    }

    // One window for the whole batch, from the single captured `now`.
    let window = session_window::calculate(
        ctx.game.session_minutes,
        ctx.game.game_end,
        ctx.actor.is_elevated,
        ctx.now,
    );
    let stamp = window.stamp();

    store.stamp_sessions(team_ids.clone(), stamp).await?;

    if mode.require_synchronized_sessions() {
        // Mirror the window onto the resource records so the readiness
        // aggregator observes a consistent launch.
        store.stamp_resource_windows(team_ids.clone(), stamp).await?;
    }

    if ctx.game.engine == GameEngine::External {
        state
            .host()
            .start_game(ctx.game.id, team_ids.clone(), stamp)
            .await?;
    }

    let deploying = mode.deploy_resources_on_session_start();
    let mut teams = IndexMap::new();
    for team in &ctx.teams {
        events::broadcast_team_session_started(state, ctx.game.id, team.team_id, &ctx.actor.id);
        teams.insert(team.team_id, summarize_team(team, deploying, &window));
    }

    Ok(StartSessionsResponse {
        game_id: ctx.game.id,
        window: (&window).into(),
        teams,
    })
}

fn summarize_team(
    team: &TeamRoster,
    resources_deploying: bool,
    window: &session_window::SessionWindow,
) -> TeamStartSummary {
    let mut roster: Vec<PlayerSummary> = team
        .players
        .iter()
        .map(|player| PlayerSummary {
            id: player.id,
            name: player.name.clone(),
            role: player.role,
        })
        .collect();
    roster.sort_by_key(|player| player.role != PlayerRole::Captain);

    TeamStartSummary {
        team_id: team.team_id,
        captain: team.captain().map(|player| player.name.clone()),
        roster,
        resources_deploying,
        window: window.into(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration as StdDuration;

    use futures::future::BoxFuture;
    use time::Duration;
    use tokio::sync::Mutex;

    use crate::config::AppConfig;
    use crate::dao::game_store::memory::MemoryStore;
    use crate::dao::models::{
        ChallengeEntity, ExternalDeployStatus, GameEntity, PlayerEntity, SessionStamp,
    };
    use crate::host::{DeployResult, GameHost, HostError, HostResult};
    use crate::state::AppState;

    use super::*;

    #[derive(Clone, Default)]
    struct FakeHost {
        inner: Arc<FakeHostInner>,
    }

    #[derive(Default)]
    struct FakeHostInner {
        deploy_delay: Option<StdDuration>,
        fail_on_call: Option<usize>,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        overlapped: AtomicBool,
        started: Mutex<Vec<(Uuid, Vec<Uuid>)>>,
    }

    impl FakeHost {
        fn failing_on_call(call: usize) -> Self {
            Self {
                inner: Arc::new(FakeHostInner {
                    fail_on_call: Some(call),
                    ..Default::default()
                }),
            }
        }

        fn with_deploy_delay(delay: StdDuration) -> Self {
            Self {
                inner: Arc::new(FakeHostInner {
                    deploy_delay: Some(delay),
                    ..Default::default()
                }),
            }
        }

        fn deploy_calls(&self) -> usize {
            self.inner.calls.load(Ordering::SeqCst)
        }

        fn overlapped(&self) -> bool {
            self.inner.overlapped.load(Ordering::SeqCst)
        }

        async fn started_games(&self) -> Vec<(Uuid, Vec<Uuid>)> {
            self.inner.started.lock().await.clone()
        }
    }

    impl GameHost for FakeHost {
        fn deploy(
            &self,
            _game_id: Uuid,
            team_id: Uuid,
        ) -> BoxFuture<'static, HostResult<DeployResult>> {
            let inner = self.inner.clone();
            Box::pin(async move {
                let call = inner.calls.fetch_add(1, Ordering::SeqCst) + 1;
                if inner.in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
                    inner.overlapped.store(true, Ordering::SeqCst);
                }
                if let Some(delay) = inner.deploy_delay {
                    tokio::time::sleep(delay).await;
                }
                inner.in_flight.fetch_sub(1, Ordering::SeqCst);

                if inner.fail_on_call == Some(call) {
                    return Err(HostError::DeployFailed {
                        team_id,
                        message: "injected failure".into(),
                    });
                }
                Ok(DeployResult {
                    team_id,
                    status: ExternalDeployStatus::Deployed,
                })
            })
        }

        fn start_game(
            &self,
            game_id: Uuid,
            team_ids: Vec<Uuid>,
            _window: SessionStamp,
        ) -> BoxFuture<'static, HostResult<()>> {
            let inner = self.inner.clone();
            Box::pin(async move {
                inner.started.lock().await.push((game_id, team_ids));
                Ok(())
            })
        }

        fn ping(&self) -> BoxFuture<'static, HostResult<()>> {
            Box::pin(async { Ok(()) })
        }
    }

    async fn build_state(host: FakeHost) -> (SharedState, Arc<dyn GameStore>) {
        let state = AppState::new(AppConfig::default(), Arc::new(host));
        let store: Arc<dyn GameStore> = Arc::new(MemoryStore::new());
        state.install_game_store(store.clone()).await;
        (state, store)
    }

    async fn seed_game(
        store: &Arc<dyn GameStore>,
        engine: GameEngine,
        require_synchronized_start: bool,
    ) -> GameEntity {
        let now = OffsetDateTime::now_utc();
        let game = GameEntity {
            id: Uuid::new_v4(),
            name: "night exercise".into(),
            engine,
            require_synchronized_start,
            session_minutes: 60,
            game_start: now - Duration::hours(1),
            game_end: now + Duration::hours(4),
            allow_late_start: true,
            min_team_size: 1,
            max_team_size: 5,
            session_limit: 0,
        };
        store.save_game(game.clone()).await.unwrap();
        game
    }

    async fn seed_team(store: &Arc<dyn GameStore>, game_id: Uuid, size: usize) -> Uuid {
        let team_id = Uuid::new_v4();
        for index in 0..size {
            store
                .save_player(PlayerEntity {
                    id: Uuid::new_v4(),
                    team_id,
                    game_id,
                    name: format!("player-{index}"),
                    role: if index == 0 {
                        PlayerRole::Captain
                    } else {
                        PlayerRole::Member
                    },
                    session_begin: None,
                    session_end: None,
                    session_minutes: 0,
                    is_late_start: false,
                })
                .await
                .unwrap();
        }
        team_id
    }

    async fn seed_deployed_resource(store: &Arc<dyn GameStore>, game_id: Uuid, team_id: Uuid) {
        store
            .save_resource(ExternalResourceEntity {
                team_id,
                game_id,
                deploy_status: ExternalDeployStatus::Deployed,
                session_begin: None,
                session_end: None,
            })
            .await
            .unwrap();
    }

    fn request(team_ids: Vec<Uuid>) -> StartSessionsRequest {
        StartSessionsRequest { team_ids }
    }

    #[tokio::test]
    async fn standard_game_starts_two_teams_end_to_end() {
        let (state, store) = build_state(FakeHost::default()).await;
        let game = seed_game(&store, GameEngine::Standard, false).await;
        let first = seed_team(&store, game.id, 2).await;
        let second = seed_team(&store, game.id, 3).await;

        let response = start_team_sessions(
            &state,
            Actor::anonymous(),
            request(vec![first, second]),
            CancellationToken::new(),
        )
        .await
        .unwrap()
        .expect("start should succeed");

        assert_eq!(response.teams.len(), 2);
        for summary in response.teams.values() {
            assert_eq!(summary.captain.as_deref(), Some("player-0"));
            assert!(!summary.resources_deploying);
        }

        let players = store.players_for_teams(vec![first, second]).await.unwrap();
        for player in &players {
            let begin = player.session_begin.expect("session begin set");
            let end = player.session_end.expect("session end set");
            assert_eq!(end - begin, Duration::minutes(60));
            assert!(!player.is_late_start);
        }
    }

    #[tokio::test]
    async fn synchronized_batch_shares_one_window() {
        let host = FakeHost::default();
        let (state, store) = build_state(host.clone()).await;
        let game = seed_game(&store, GameEngine::External, true).await;
        let first = seed_team(&store, game.id, 2).await;
        let second = seed_team(&store, game.id, 2).await;
        seed_deployed_resource(&store, game.id, first).await;
        seed_deployed_resource(&store, game.id, second).await;

        let response = start_team_sessions(
            &state,
            Actor::anonymous(),
            request(vec![first, second]),
            CancellationToken::new(),
        )
        .await
        .unwrap()
        .expect("start should succeed");

        let windows: Vec<_> = response
            .teams
            .values()
            .map(|team| (team.window.begin, team.window.end, team.window.length_minutes))
            .collect();
        assert!(windows.windows(2).all(|pair| pair[0] == pair[1]));

        // The shared window is also pushed onto each resource record.
        let resources = store.resources_for_teams(vec![first, second]).await.unwrap();
        assert_eq!(resources.len(), 2);
        let stamped: Vec<_> = resources
            .iter()
            .map(|resource| (resource.session_begin, resource.session_end))
            .collect();
        assert_eq!(stamped[0], stamped[1]);
        assert!(stamped[0].0.is_some());

        assert_eq!(host.started_games().await.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_starts_for_one_game_serialize() {
        let host = FakeHost::with_deploy_delay(StdDuration::from_millis(100));
        let (state, store) = build_state(host.clone()).await;
        let game = seed_game(&store, GameEngine::External, false).await;
        let first = seed_team(&store, game.id, 1).await;
        let second = seed_team(&store, game.id, 1).await;

        let left = {
            let state = state.clone();
            tokio::spawn(async move {
                start_team_sessions(
                    &state,
                    Actor::anonymous(),
                    request(vec![first]),
                    CancellationToken::new(),
                )
                .await
            })
        };
        let right = {
            let state = state.clone();
            tokio::spawn(async move {
                start_team_sessions(
                    &state,
                    Actor::anonymous(),
                    request(vec![second]),
                    CancellationToken::new(),
                )
                .await
            })
        };

        let left = left.await.unwrap().unwrap();
        let right = right.await.unwrap().unwrap();
        assert!(left.is_some());
        assert!(right.is_some());

        // The second critical section must not begin until the first released
        // the game lock, so deploy calls never overlap.
        assert_eq!(host.deploy_calls(), 2);
        assert!(!host.overlapped());
    }

    #[tokio::test]
    async fn concurrent_double_start_of_one_team_commits_once() {
        let host = FakeHost::with_deploy_delay(StdDuration::from_millis(100));
        let (state, store) = build_state(host.clone()).await;
        let game = seed_game(&store, GameEngine::External, false).await;
        let team = seed_team(&store, game.id, 1).await;

        // Both requests pass pre-lock validation before either holds the lock;
        // the loser must be rejected by the under-lock re-check instead of
        // restamping the winner's session.
        let left = {
            let state = state.clone();
            tokio::spawn(async move {
                start_team_sessions(
                    &state,
                    Actor::anonymous(),
                    request(vec![team]),
                    CancellationToken::new(),
                )
                .await
            })
        };
        let right = {
            let state = state.clone();
            tokio::spawn(async move {
                start_team_sessions(
                    &state,
                    Actor::anonymous(),
                    request(vec![team]),
                    CancellationToken::new(),
                )
                .await
            })
        };

        let outcomes = [left.await.unwrap(), right.await.unwrap()];
        let successes = outcomes
            .iter()
            .filter(|outcome| matches!(outcome, Ok(Some(_))))
            .count();
        let rejections = outcomes
            .iter()
            .filter(|outcome| matches!(outcome, Err(ServiceError::InvalidState(_))))
            .count();
        assert_eq!(successes, 1);
        assert_eq!(rejections, 1);

        // One deploy, one surviving window.
        assert_eq!(host.deploy_calls(), 1);
        let players = store.players_for_teams(vec![team]).await.unwrap();
        let winner = outcomes
            .iter()
            .find_map(|outcome| match outcome {
                Ok(Some(response)) => Some(response.window.begin),
                _ => None,
            })
            .expect("one start succeeded");
        assert!(
            players
                .iter()
                .all(|player| player.session_begin == Some(winner))
        );
    }

    #[tokio::test]
    async fn shutdown_token_cancels_pending_starts() {
        let host = FakeHost::default();
        let (state, store) = build_state(host.clone()).await;
        let game = seed_game(&store, GameEngine::External, false).await;
        let team = seed_team(&store, game.id, 1).await;

        state.shutdown_token().cancel();
        let cancel = state.shutdown_token().child_token();

        let err = start_team_sessions(&state, Actor::anonymous(), request(vec![team]), cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Cancelled));
        assert_eq!(host.deploy_calls(), 0);
    }

    #[tokio::test]
    async fn failed_deploy_rolls_back_every_team() {
        let host = FakeHost::failing_on_call(3);
        let (state, store) = build_state(host.clone()).await;
        let game = seed_game(&store, GameEngine::External, false).await;
        let teams = vec![
            seed_team(&store, game.id, 1).await,
            seed_team(&store, game.id, 1).await,
            seed_team(&store, game.id, 1).await,
        ];
        for &team_id in &teams {
            store
                .save_challenge(ChallengeEntity {
                    id: Uuid::new_v4(),
                    spec_id: Uuid::new_v4(),
                    team_id,
                    game_id: game.id,
                    points: 100,
                    score: 0,
                    started_at: OffsetDateTime::now_utc(),
                    ended_at: None,
                    solved_at: None,
                })
                .await
                .unwrap();
        }

        let outcome = start_team_sessions(
            &state,
            Actor::anonymous(),
            request(teams.clone()),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        // Rolled back, not crashed.
        assert!(outcome.is_none());
        assert_eq!(host.deploy_calls(), 3);

        let players = store.players_for_teams(teams.clone()).await.unwrap();
        assert!(players.iter().all(|player| !player.session_started()));

        // External mode preserves challenge records for the host to reconcile.
        for &team_id in &teams {
            let challenges = store.challenges_for_team(team_id).await.unwrap();
            assert!(challenges.iter().all(|challenge| challenge.ended_at.is_none()));
        }
    }

    #[tokio::test]
    async fn teams_spanning_two_games_are_rejected_without_side_effects() {
        let (state, store) = build_state(FakeHost::default()).await;
        let first_game = seed_game(&store, GameEngine::Standard, false).await;
        let second_game = seed_game(&store, GameEngine::Standard, false).await;
        let first = seed_team(&store, first_game.id, 1).await;
        let second = seed_team(&store, second_game.id, 1).await;

        let err = start_team_sessions(
            &state,
            Actor::anonymous(),
            request(vec![first, second]),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ServiceError::InvalidInput(_)));
        let players = store.players_for_teams(vec![first, second]).await.unwrap();
        assert!(players.iter().all(|player| !player.session_started()));
    }

    #[tokio::test]
    async fn unready_synchronized_team_fails_validation_before_any_write() {
        let host = FakeHost::default();
        let (state, store) = build_state(host.clone()).await;
        let game = seed_game(&store, GameEngine::External, true).await;
        let ready = seed_team(&store, game.id, 1).await;
        let lagging = seed_team(&store, game.id, 1).await;
        seed_deployed_resource(&store, game.id, ready).await;
        store
            .save_resource(ExternalResourceEntity {
                team_id: lagging,
                game_id: game.id,
                deploy_status: ExternalDeployStatus::Deploying,
                session_begin: None,
                session_end: None,
            })
            .await
            .unwrap();

        let err = start_team_sessions(
            &state,
            Actor::anonymous(),
            request(vec![ready, lagging]),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();

        match err {
            ServiceError::NotReady(teams) => assert!(teams.contains(&lagging.to_string())),
            other => panic!("expected NotReady, got {other:?}"),
        }
        assert_eq!(host.deploy_calls(), 0);
        let players = store.players_for_teams(vec![ready, lagging]).await.unwrap();
        assert!(players.iter().all(|player| !player.session_started()));
    }

    #[tokio::test]
    async fn already_started_team_is_rejected() {
        let (state, store) = build_state(FakeHost::default()).await;
        let game = seed_game(&store, GameEngine::Standard, false).await;
        let team = seed_team(&store, game.id, 1).await;

        let first = start_team_sessions(
            &state,
            Actor::anonymous(),
            request(vec![team]),
            CancellationToken::new(),
        )
        .await
        .unwrap();
        assert!(first.is_some());

        let err = start_team_sessions(
            &state,
            Actor::anonymous(),
            request(vec![team]),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn cancelled_request_is_dropped_before_any_work() {
        let host = FakeHost::default();
        let (state, store) = build_state(host.clone()).await;
        let game = seed_game(&store, GameEngine::External, false).await;
        let team = seed_team(&store, game.id, 1).await;

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = start_team_sessions(&state, Actor::anonymous(), request(vec![team]), cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Cancelled));
        assert_eq!(host.deploy_calls(), 0);
    }

    #[tokio::test]
    async fn late_start_is_truncated_for_regular_callers() {
        let (state, store) = build_state(FakeHost::default()).await;
        let now = OffsetDateTime::now_utc();
        let game = GameEntity {
            id: Uuid::new_v4(),
            name: "closing soon".into(),
            engine: GameEngine::Standard,
            require_synchronized_start: false,
            session_minutes: 120,
            game_start: now - Duration::hours(1),
            game_end: now + Duration::minutes(30),
            allow_late_start: true,
            min_team_size: 1,
            max_team_size: 5,
            session_limit: 0,
        };
        store.save_game(game.clone()).await.unwrap();
        let team = seed_team(&store, game.id, 1).await;

        let response = start_team_sessions(
            &state,
            Actor::anonymous(),
            request(vec![team]),
            CancellationToken::new(),
        )
        .await
        .unwrap()
        .expect("start should succeed");

        assert!(response.window.is_late_start);
        assert_eq!(response.window.end, game.game_end);
    }

    #[tokio::test]
    async fn session_limit_caps_concurrent_sessions() {
        let (state, store) = build_state(FakeHost::default()).await;
        let mut game = seed_game(&store, GameEngine::Standard, false).await;
        game.session_limit = 1;
        store.save_game(game.clone()).await.unwrap();
        let first = seed_team(&store, game.id, 1).await;
        let second = seed_team(&store, game.id, 1).await;

        start_team_sessions(
            &state,
            Actor::anonymous(),
            request(vec![first]),
            CancellationToken::new(),
        )
        .await
        .unwrap()
        .expect("first start should succeed");

        let err = start_team_sessions(
            &state,
            Actor::anonymous(),
            request(vec![second]),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        let active = store
            .count_active_sessions(game.id, OffsetDateTime::now_utc())
            .await
            .unwrap();
        assert_eq!(active, 1);
    }
}
