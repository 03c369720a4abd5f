//! Session lifecycle and display-name allocation.
//!
//! A session is the server-side record that authenticates and names one
//! player. Session ids double as bearer tokens, so they are v4 UUIDs
//! (122 random bits). Display names are globally unique case-insensitively
//! for as long as the owning session lives; reservation and release are
//! atomic with session creation and deletion inside the registry.

use std::time::Instant;

use log::info;
use uuid::Uuid;

use shared::LeaveReason;

use crate::error::ApiError;
use crate::rooms;
use crate::state::ServerState;

pub const NAME_MIN_LEN: usize = 2;
pub const NAME_MAX_LEN: usize = 16;

/// Names that can never be claimed, compared case-insensitively.
pub const RESERVED_NAMES: [&str; 6] = ["admin", "test", "server", "system", "bot", "ai"];

#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub player_id: Uuid,
    pub display_name: String,
    pub created_at: Instant,
    pub last_activity: Instant,
    pub current_room_id: Option<Uuid>,
    pub current_game_id: Option<Uuid>,
}

impl Session {
    pub fn new(display_name: String) -> Self {
        let now = Instant::now();
        Session {
            id: Uuid::new_v4(),
            player_id: Uuid::new_v4(),
            display_name,
            created_at: now,
            last_activity: now,
            current_room_id: None,
            current_game_id: None,
        }
    }
}

/// Caller identity copied out of the registry during auth, so handlers can
/// keep borrowing the state mutably afterwards.
#[derive(Debug, Clone, Copy)]
pub struct AuthCtx {
    pub session_id: Uuid,
    pub player_id: Uuid,
    pub current_room_id: Option<Uuid>,
    pub current_game_id: Option<Uuid>,
}

/// Trim and validate a requested display name; returns the trimmed form.
pub fn validate_name(raw: &str) -> Result<String, ApiError> {
    let name = raw.trim();
    let len = name.chars().count();
    if !(NAME_MIN_LEN..=NAME_MAX_LEN).contains(&len) {
        return Err(ApiError::InvalidName(format!(
            "name must be {NAME_MIN_LEN}-{NAME_MAX_LEN} characters"
        )));
    }
    if RESERVED_NAMES.contains(&name.to_lowercase().as_str()) {
        return Err(ApiError::NameReserved);
    }
    Ok(name.to_string())
}

/// Validation plus availability, without mutating anything.
pub fn check_name(state: &ServerState, raw: &str) -> Result<(), ApiError> {
    let name = validate_name(raw)?;
    if state.registry.name_taken(&name.to_lowercase()) {
        return Err(ApiError::NameTaken);
    }
    Ok(())
}

/// Create a session for a fresh player. Returns `(session_id, player_id)`.
pub fn join_server(state: &mut ServerState, raw_name: &str) -> Result<(Uuid, Uuid), ApiError> {
    let name = validate_name(raw_name)?;
    if state.registry.name_taken(&name.to_lowercase()) {
        return Err(ApiError::NameTaken);
    }
    let session = Session::new(name);
    let ids = (session.id, session.player_id);
    info!("player {} joined as {:?}", session.player_id, session.display_name);
    state.registry.insert_session(session);
    Ok(ids)
}

/// Destroy a session: leaves the current room first, drops any live duplex
/// channel, and releases the name.
pub fn leave_server(state: &mut ServerState, session_id: Uuid) -> Result<(), ApiError> {
    let session = state
        .registry
        .session(&session_id)
        .ok_or(ApiError::Unauthorized)?;
    let player_id = session.player_id;
    if session.current_room_id.is_some() {
        // Best-effort: the session is going away either way.
        let _ = rooms::leave_room(state, player_id, LeaveReason::Leave);
    }
    state.connections.drop_channel(player_id);
    state.connections.clear_grace(player_id);
    if let Some(session) = state.registry.remove_session(&session_id) {
        info!(
            "player {} left the server ({:?} released)",
            session.player_id, session.display_name
        );
    }
    Ok(())
}

/// Look up a bearer token, refresh the activity clock, and return the
/// caller's identity.
pub fn authenticate(state: &mut ServerState, token: &str) -> Result<AuthCtx, ApiError> {
    let session_id = Uuid::parse_str(token).map_err(|_| ApiError::Unauthorized)?;
    let session = state
        .registry
        .session_mut(&session_id)
        .ok_or(ApiError::Unauthorized)?;
    session.last_activity = Instant::now();
    Ok(AuthCtx {
        session_id: session.id,
        player_id: session.player_id,
        current_room_id: session.current_room_id,
        current_game_id: session.current_game_id,
    })
}

/// GC path for sessions idle past the TTL. Mirrors `leave_server` but never
/// fails: the session may already be half torn down.
pub fn expire_session(state: &mut ServerState, session_id: Uuid) {
    let Some(session) = state.registry.session(&session_id) else {
        return;
    };
    let player_id = session.player_id;
    if session.current_room_id.is_some() {
        let _ = rooms::leave_room(state, player_id, LeaveReason::Disconnect);
    }
    state.connections.drop_channel(player_id);
    state.connections.clear_grace(player_id);
    if let Some(session) = state.registry.remove_session(&session_id) {
        info!(
            "expired idle session for player {} ({:?})",
            session.player_id, session.display_name
        );
    }
}
