//! The versioned request surface: translates HTTP requests into controller
//! calls and shapes `{success, data}` / `{success: false, error}` envelopes.
//!
//! Handlers authenticate, take the server lock, call into the session/room/
//! game modules, release the lock, then spawn any timers the call produced.

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use shared::{BoardType, GameMode, GameSnapshot, LobbySummary, RematchStateView, RoomView};

use crate::controller::{self, StartGameData};
use crate::error::ApiError;
use crate::rooms;
use crate::sessions::{self, AuthCtx};
use crate::state::{ServerState, SharedState};
use crate::tasks;
use crate::utils::get_timestamp;
use crate::ws;

pub const SERVER_NAME: &str = "sequence-server";

pub fn create_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/v1/ping", get(ping))
        .route("/v1/check-name", post(check_name))
        .route("/v1/join-server", post(join_server))
        .route("/v1/leave-server", post(leave_server))
        .route("/v1/session", get(session_status))
        .route("/v1/rooms", get(list_rooms).post(create_room))
        .route("/v1/rooms/:id/join", post(join_room))
        .route("/v1/rooms/:id/leave", post(leave_room))
        .route("/v1/rooms/:id/ready", post(set_ready))
        .route("/v1/rooms/:id/team", post(change_team))
        .route("/v1/rooms/:id/start", post(start_game))
        .route("/v1/games/:id/turn", post(turn))
        .route("/v1/games/:id/rematch", post(rematch_vote))
        .route("/v1/games/:id/rematch/cancel", post(cancel_rematch))
        .route("/ws", get(ws::ws_handler))
        .layer(cors)
        .with_state(state)
}

// ── Response envelope ───────────────────────────────────────────────────

#[derive(Serialize)]
struct ApiOk<T: Serialize> {
    success: bool,
    data: T,
}

fn ok<T: Serialize>(data: T) -> Json<ApiOk<T>> {
    Json(ApiOk {
        success: true,
        data,
    })
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)
}

fn authorize(state: &mut ServerState, headers: &HeaderMap) -> Result<AuthCtx, ApiError> {
    let token = bearer_token(headers)?;
    sessions::authenticate(state, token)
}

// ── Request/Response types ──────────────────────────────────────────────

#[derive(Deserialize)]
struct CheckNameRequest {
    name: String,
}

#[derive(Serialize)]
struct NameAvailability {
    available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

#[derive(Deserialize)]
struct JoinServerRequest {
    name: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionCredentials {
    session_id: Uuid,
    player_id: Uuid,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionStatusData {
    current_room_id: Option<Uuid>,
    current_game_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    game_state: Option<GameSnapshot>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateRoomRequest {
    name: String,
    mode: GameMode,
    board_type: BoardType,
    #[serde(default)]
    password: Option<String>,
}

#[derive(Deserialize, Default)]
struct JoinRoomRequest {
    #[serde(default)]
    password: Option<String>,
}

#[derive(Deserialize)]
struct SetReadyRequest {
    ready: bool,
}

#[derive(Deserialize)]
struct ChangeTeamRequest {
    team: u8,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TurnRequest {
    card_index: usize,
    row: usize,
    col: usize,
}

#[derive(Deserialize)]
struct RematchVoteRequest {
    vote: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RematchVoteData {
    rematch_state: RematchStateView,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PingData {
    ok: bool,
    server_name: &'static str,
    version: &'static str,
    timestamp: u64,
}

// ── Handlers ────────────────────────────────────────────────────────────

async fn ping() -> Json<ApiOk<PingData>> {
    ok(PingData {
        ok: true,
        server_name: SERVER_NAME,
        version: env!("CARGO_PKG_VERSION"),
        timestamp: get_timestamp(),
    })
}

async fn check_name(
    State(state): State<SharedState>,
    Json(req): Json<CheckNameRequest>,
) -> Json<ApiOk<NameAvailability>> {
    let st = state.lock().await;
    let availability = match sessions::check_name(&st, &req.name) {
        Ok(()) => NameAvailability {
            available: true,
            reason: None,
        },
        Err(err) => NameAvailability {
            available: false,
            reason: Some(err.to_string()),
        },
    };
    ok(availability)
}

async fn join_server(
    State(state): State<SharedState>,
    Json(req): Json<JoinServerRequest>,
) -> Result<Json<ApiOk<SessionCredentials>>, ApiError> {
    let mut st = state.lock().await;
    let (session_id, player_id) = sessions::join_server(&mut st, &req.name)?;
    Ok(ok(SessionCredentials {
        session_id,
        player_id,
    }))
}

async fn leave_server(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<ApiOk<Value>>, ApiError> {
    let mut st = state.lock().await;
    let ctx = authorize(&mut st, &headers)?;
    sessions::leave_server(&mut st, ctx.session_id)?;
    Ok(ok(json!({})))
}

async fn session_status(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<ApiOk<SessionStatusData>>, ApiError> {
    let mut st = state.lock().await;
    let ctx = authorize(&mut st, &headers)?;
    let game_state = ctx
        .current_game_id
        .and_then(|game_id| st.registry.game(&game_id))
        .map(|game| game.snapshot(ctx.player_id));
    Ok(ok(SessionStatusData {
        current_room_id: ctx.current_room_id,
        current_game_id: ctx.current_game_id,
        game_state,
    }))
}

async fn list_rooms(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<ApiOk<Vec<LobbySummary>>>, ApiError> {
    let mut st = state.lock().await;
    authorize(&mut st, &headers)?;
    Ok(ok(rooms::list_rooms(&st)))
}

async fn create_room(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(req): Json<CreateRoomRequest>,
) -> Result<Json<ApiOk<RoomView>>, ApiError> {
    let mut st = state.lock().await;
    let ctx = authorize(&mut st, &headers)?;
    let view = rooms::create_room(
        &mut st,
        &ctx,
        &req.name,
        req.mode,
        req.board_type,
        req.password,
    )?;
    Ok(ok(view))
}

async fn join_room(
    State(state): State<SharedState>,
    Path(room_id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<JoinRoomRequest>,
) -> Result<Json<ApiOk<RoomView>>, ApiError> {
    let mut st = state.lock().await;
    let ctx = authorize(&mut st, &headers)?;
    let view = rooms::join_room(&mut st, &ctx, room_id, req.password.as_deref())?;
    Ok(ok(view))
}

async fn leave_room(
    State(state): State<SharedState>,
    Path(room_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<ApiOk<Value>>, ApiError> {
    let mut st = state.lock().await;
    let ctx = authorize(&mut st, &headers)?;
    if ctx.current_room_id != Some(room_id) {
        return Err(ApiError::Forbidden("you are not in this room".into()));
    }
    rooms::leave_room(&mut st, ctx.player_id, shared::LeaveReason::Leave)?;
    Ok(ok(json!({})))
}

async fn set_ready(
    State(state): State<SharedState>,
    Path(room_id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<SetReadyRequest>,
) -> Result<Json<ApiOk<Value>>, ApiError> {
    let mut st = state.lock().await;
    let ctx = authorize(&mut st, &headers)?;
    rooms::set_ready(&mut st, &ctx, room_id, req.ready)?;
    Ok(ok(json!({})))
}

async fn change_team(
    State(state): State<SharedState>,
    Path(room_id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<ChangeTeamRequest>,
) -> Result<Json<ApiOk<Value>>, ApiError> {
    let mut st = state.lock().await;
    let ctx = authorize(&mut st, &headers)?;
    rooms::change_team(&mut st, &ctx, room_id, req.team)?;
    Ok(ok(json!({})))
}

async fn start_game(
    State(state): State<SharedState>,
    Path(room_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<ApiOk<StartGameData>>, ApiError> {
    let (data, due) = {
        let mut st = state.lock().await;
        let ctx = authorize(&mut st, &headers)?;
        controller::start_game(&mut st, &ctx, room_id)?
    };
    if let Some(due) = due {
        tasks::spawn_ai_turn(state.clone(), due);
    }
    Ok(ok(data))
}

async fn turn(
    State(state): State<SharedState>,
    Path(game_id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<TurnRequest>,
) -> Result<Json<ApiOk<Value>>, ApiError> {
    let due = {
        let mut st = state.lock().await;
        let ctx = authorize(&mut st, &headers)?;
        controller::play_turn(&mut st, &ctx, game_id, req.card_index, req.row, req.col)?
    };
    if let Some(due) = due {
        tasks::spawn_ai_turn(state.clone(), due);
    }
    Ok(ok(json!({})))
}

async fn rematch_vote(
    State(state): State<SharedState>,
    Path(game_id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<RematchVoteRequest>,
) -> Result<Json<ApiOk<RematchVoteData>>, ApiError> {
    let (view, follow_ups) = {
        let mut st = state.lock().await;
        let ctx = authorize(&mut st, &headers)?;
        controller::vote_rematch(&mut st, &ctx, game_id, req.vote)?
    };
    tasks::spawn_follow_ups(&state, follow_ups);
    Ok(ok(RematchVoteData {
        rematch_state: view,
    }))
}

async fn cancel_rematch(
    State(state): State<SharedState>,
    Path(game_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<ApiOk<Value>>, ApiError> {
    let mut st = state.lock().await;
    let ctx = authorize(&mut st, &headers)?;
    controller::cancel_rematch(&mut st, &ctx, game_id)?;
    Ok(ok(json!({})))
}
