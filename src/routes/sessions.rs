use axum::{
    Json, Router,
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::sessions::{Actor, PlayStateResponse, StartSessionsRequest, StartSessionsResponse},
    error::AppError,
    services::start_service,
    state::SharedState,
};

/// Header carrying the caller's identifier. Authentication happens upstream.
const ACTOR_ID_HEADER: &str = "x-actor-id";
/// Header flagging the caller as elevated (administrative).
const ACTOR_ADMIN_HEADER: &str = "x-actor-admin";

/// Routes driving team session starts and play-state queries.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games/sessions/start", post(start_sessions))
        .route("/games/{id}/play-state", get(play_state))
}

/// Start play sessions for one or more teams of a single game.
#[utoipa::path(
    post,
    path = "/games/sessions/start",
    tag = "sessions",
    request_body = StartSessionsRequest,
    responses(
        (status = 200, description = "Sessions started", body = StartSessionsResponse),
        (status = 400, description = "Malformed request"),
        (status = 409, description = "A precondition failed; nothing was mutated"),
        (status = 503, description = "Start failed mid-flight and every team was reset")
    )
)]
pub async fn start_sessions(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Valid(Json(payload)): Valid<Json<StartSessionsRequest>>,
) -> Result<Json<StartSessionsResponse>, AppError> {
    let actor = actor_from_headers(&headers);
    let cancel = state.shutdown_token().child_token();
    let outcome = start_service::start_team_sessions(&state, actor, payload, cancel).await?;

    match outcome {
        Some(response) => Ok(Json(response)),
        None => Err(AppError::ServiceUnavailable(
            "session start failed; every team was reset".into(),
        )),
    }
}

/// Report a game's derived play state.
#[utoipa::path(
    get,
    path = "/games/{id}/play-state",
    tag = "sessions",
    params(("id" = Uuid, Path, description = "Identifier of the game")),
    responses(
        (status = 200, description = "Derived play state", body = PlayStateResponse),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn play_state(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PlayStateResponse>, AppError> {
    let play_state = start_service::game_play_state(&state, id).await?;
    Ok(Json(PlayStateResponse {
        game_id: id,
        state: play_state,
    }))
}

fn actor_from_headers(headers: &HeaderMap) -> Actor {
    let is_elevated = headers
        .get(ACTOR_ADMIN_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == "true" || value == "1");

    match headers
        .get(ACTOR_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
    {
        Some(id) => Actor {
            id: id.to_string(),
            is_elevated,
        },
        None => Actor {
            is_elevated,
            ..Actor::anonymous()
        },
    }
}
