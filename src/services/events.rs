//! Fire-and-forget launch lifecycle notifications. These never block or fail
//! the orchestration; a serialization problem is logged and dropped.

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dto::sse::{
        LaunchEndedEvent, LaunchFailedEvent, LaunchStartedEvent, ServerEvent,
        TeamSessionStartedEvent,
    },
    state::SharedState,
};

const EVENT_LAUNCH_STARTED: &str = "launch.started";
const EVENT_LAUNCH_ENDED: &str = "launch.ended";
const EVENT_LAUNCH_FAILED: &str = "launch.failed";
const EVENT_TEAM_SESSION_STARTED: &str = "team.session-started";

/// Broadcast that a start orchestration entered its critical section.
pub fn broadcast_launch_started(state: &SharedState, game_id: Uuid, team_ids: &[Uuid], actor: &str) {
    let payload = LaunchStartedEvent {
        game_id,
        team_ids: team_ids.to_vec(),
        actor: actor.to_string(),
    };
    send_event(state, EVENT_LAUNCH_STARTED, &payload);
}

/// Broadcast that a start orchestration committed successfully.
pub fn broadcast_launch_ended(state: &SharedState, game_id: Uuid, team_ids: &[Uuid], actor: &str) {
    let payload = LaunchEndedEvent {
        game_id,
        team_ids: team_ids.to_vec(),
        actor: actor.to_string(),
    };
    send_event(state, EVENT_LAUNCH_ENDED, &payload);
}

/// Broadcast that a start orchestration failed and its teams were reset.
pub fn broadcast_launch_failed(
    state: &SharedState,
    game_id: Uuid,
    team_ids: &[Uuid],
    actor: &str,
    error: &str,
) {
    let payload = LaunchFailedEvent {
        game_id,
        team_ids: team_ids.to_vec(),
        actor: actor.to_string(),
        error: error.to_string(),
    };
    send_event(state, EVENT_LAUNCH_FAILED, &payload);
}

/// Broadcast that one team's session timestamps were committed.
pub fn broadcast_team_session_started(
    state: &SharedState,
    game_id: Uuid,
    team_id: Uuid,
    actor: &str,
) {
    let payload = TeamSessionStartedEvent {
        game_id,
        team_id,
        actor: actor.to_string(),
    };
    send_event(state, EVENT_TEAM_SESSION_STARTED, &payload);
}

fn send_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.events().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize SSE payload"),
    }
}
