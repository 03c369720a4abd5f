//! Room lifecycle: create/join/leave, readiness, team balance, host
//! transfer, and the lobby projection.
//!
//! Rooms are mutated only through the functions here (or the game
//! controller's start/rematch paths), all of which run under the server
//! lock. Every mutation that observers can see is followed by the matching
//! broadcast, so a `room_updated` always reflects the room at or after the
//! change that caused it.

use log::info;
use uuid::Uuid;

use shared::{
    GameMode, LeaveReason, LobbySummary, RoomPlayerView, RoomStatus, RoomView, ServerEvent, Team,
};

use crate::error::ApiError;
use crate::sessions::AuthCtx;
use crate::state::ServerState;
use crate::utils::get_timestamp;

pub const ROOM_NAME_MIN_LEN: usize = 3;
pub const ROOM_NAME_MAX_LEN: usize = 30;

#[derive(Debug, Clone)]
pub struct RoomPlayer {
    pub player_id: Uuid,
    pub display_name: String,
    pub is_host: bool,
    pub is_ready: bool,
    pub is_ai: bool,
    pub team: Team,
    pub joined_at: u64,
}

impl RoomPlayer {
    pub fn human(player_id: Uuid, display_name: String, is_host: bool, team: Team) -> Self {
        RoomPlayer {
            player_id,
            display_name,
            is_host,
            // The host is always ready.
            is_ready: is_host,
            is_ai: false,
            team,
            joined_at: get_timestamp(),
        }
    }

    pub fn ai(display_name: String, team: Team) -> Self {
        RoomPlayer {
            player_id: Uuid::new_v4(),
            display_name,
            is_host: false,
            is_ready: true,
            is_ai: true,
            team,
            joined_at: get_timestamp(),
        }
    }

    pub fn view(&self) -> RoomPlayerView {
        RoomPlayerView {
            id: self.player_id,
            name: self.display_name.clone(),
            is_host: self.is_host,
            is_ready: self.is_ready,
            is_ai: self.is_ai,
            team: self.team,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Room {
    pub id: Uuid,
    pub name: String,
    pub mode: GameMode,
    pub board_type: shared::BoardType,
    pub password: Option<String>,
    pub status: RoomStatus,
    pub host_id: Uuid,
    pub players: Vec<RoomPlayer>,
    pub created_at: u64,
    pub game_id: Option<Uuid>,
}

impl Room {
    pub fn new(
        name: String,
        mode: GameMode,
        board_type: shared::BoardType,
        password: Option<String>,
        host: RoomPlayer,
    ) -> Self {
        Room {
            id: Uuid::new_v4(),
            name,
            mode,
            board_type,
            password,
            status: RoomStatus::Waiting,
            host_id: host.player_id,
            players: vec![host],
            created_at: get_timestamp(),
            game_id: None,
        }
    }

    pub fn max_players(&self) -> usize {
        self.mode.max_players()
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.max_players()
    }

    pub fn contains(&self, player_id: Uuid) -> bool {
        self.players.iter().any(|p| p.player_id == player_id)
    }

    pub fn player_mut(&mut self, player_id: Uuid) -> Option<&mut RoomPlayer> {
        self.players.iter_mut().find(|p| p.player_id == player_id)
    }

    pub fn human_ids(&self) -> Vec<Uuid> {
        self.players
            .iter()
            .filter(|p| !p.is_ai)
            .map(|p| p.player_id)
            .collect()
    }

    pub fn has_humans(&self) -> bool {
        self.players.iter().any(|p| !p.is_ai)
    }

    /// Members on a team, optionally ignoring one player (used when that
    /// player is the one moving).
    pub fn team_count(&self, team: Team, exclude: Option<Uuid>) -> usize {
        self.players
            .iter()
            .filter(|p| p.team == team && Some(p.player_id) != exclude)
            .count()
    }

    /// The team a joiner lands on: whichever has fewer members, team 1 on a
    /// tie.
    pub fn balanced_team(&self) -> Team {
        if self.team_count(Team::Two, None) < self.team_count(Team::One, None) {
            Team::Two
        } else {
            Team::One
        }
    }

    pub fn view(&self) -> RoomView {
        RoomView {
            id: self.id,
            name: self.name.clone(),
            mode: self.mode,
            board_type: self.board_type,
            has_password: self.password.is_some(),
            status: self.status,
            players: self.players.iter().map(RoomPlayer::view).collect(),
            max_players: self.max_players(),
            host_id: self.host_id,
        }
    }

    pub fn summary(&self) -> LobbySummary {
        let host_name = self
            .players
            .iter()
            .find(|p| p.is_host)
            .map(|p| p.display_name.clone())
            .unwrap_or_default();
        LobbySummary {
            id: self.id,
            name: self.name.clone(),
            mode: self.mode,
            board_type: self.board_type,
            has_password: self.password.is_some(),
            status: self.status,
            players: self.players.len(),
            max_players: self.max_players(),
            host_name,
        }
    }
}

pub fn create_room(
    state: &mut ServerState,
    ctx: &AuthCtx,
    raw_name: &str,
    mode: GameMode,
    board_type: shared::BoardType,
    password: Option<String>,
) -> Result<RoomView, ApiError> {
    if ctx.current_room_id.is_some() {
        return Err(ApiError::Conflict("you are already in a room".into()));
    }
    let name = raw_name.trim();
    let len = name.chars().count();
    if !(ROOM_NAME_MIN_LEN..=ROOM_NAME_MAX_LEN).contains(&len) {
        return Err(ApiError::InvalidArg(format!(
            "room name must be {ROOM_NAME_MIN_LEN}-{ROOM_NAME_MAX_LEN} characters"
        )));
    }
    let password = password.filter(|p| !p.is_empty());
    let display_name = state
        .registry
        .session(&ctx.session_id)
        .ok_or(ApiError::Unauthorized)?
        .display_name
        .clone();

    let host = RoomPlayer::human(ctx.player_id, display_name, true, Team::One);
    let room = Room::new(name.to_string(), mode, board_type, password, host);
    let view = room.view();
    let room_id = room.id;
    state.registry.insert_room(room);
    if let Some(session) = state.registry.session_mut(&ctx.session_id) {
        session.current_room_id = Some(room_id);
    }
    info!("player {} created room {} ({:?})", ctx.player_id, room_id, mode);
    Ok(view)
}

pub fn join_room(
    state: &mut ServerState,
    ctx: &AuthCtx,
    room_id: Uuid,
    password: Option<&str>,
) -> Result<RoomView, ApiError> {
    if ctx.current_room_id.is_some() {
        return Err(ApiError::Conflict("you are already in a room".into()));
    }
    let display_name = state
        .registry
        .session(&ctx.session_id)
        .ok_or(ApiError::Unauthorized)?
        .display_name
        .clone();

    let room = state
        .registry
        .room_mut(&room_id)
        .ok_or(ApiError::NotFound("room"))?;
    if room.status != RoomStatus::Waiting {
        return Err(ApiError::Conflict("room is not accepting players".into()));
    }
    if room.is_full() {
        return Err(ApiError::Conflict("room is full".into()));
    }
    if let Some(expected) = &room.password {
        if password != Some(expected.as_str()) {
            return Err(ApiError::Conflict("wrong password".into()));
        }
    }

    let team = room.balanced_team();
    let player = RoomPlayer::human(ctx.player_id, display_name, false, team);
    let player_view = player.view();
    room.players.push(player);
    let view = room.view();
    let recipients = room.human_ids();

    if let Some(session) = state.registry.session_mut(&ctx.session_id) {
        session.current_room_id = Some(room_id);
    }
    state.connections.send_many(
        &recipients,
        &ServerEvent::PlayerJoined {
            room_id,
            player: player_view,
        },
    );
    state
        .connections
        .send_many(&recipients, &ServerEvent::RoomUpdated { room: view.clone() });
    info!("player {} joined room {}", ctx.player_id, room_id);
    Ok(view)
}

/// Remove a player from their current room, transferring the host role to
/// the earliest-joined remaining human and deleting the room once no humans
/// are left.
pub fn leave_room(
    state: &mut ServerState,
    player_id: Uuid,
    reason: LeaveReason,
) -> Result<(), ApiError> {
    let session = state
        .registry
        .session_by_player(&player_id)
        .ok_or(ApiError::Unauthorized)?;
    let session_id = session.id;
    let room_id = session
        .current_room_id
        .ok_or_else(|| ApiError::Conflict("you are not in a room".into()))?;

    let room = state
        .registry
        .room_mut(&room_id)
        .ok_or(ApiError::NotFound("room"))?;
    room.players.retain(|p| p.player_id != player_id);

    if let Some(session) = state.registry.session_mut(&session_id) {
        session.current_room_id = None;
    }

    let room = match state.registry.room_mut(&room_id) {
        Some(room) => room,
        None => return Ok(()),
    };
    if !room.has_humans() {
        state.registry.remove_room(&room_id);
        info!("room {} deleted (no humans left)", room_id);
        return Ok(());
    }

    // Host transfer: earliest-joined human takes over.
    let mut new_host_id = None;
    if room.host_id == player_id {
        if let Some(next_host_id) = room
            .players
            .iter()
            .filter(|p| !p.is_ai)
            .min_by_key(|p| p.joined_at)
            .map(|p| p.player_id)
        {
            room.host_id = next_host_id;
            new_host_id = Some(next_host_id);
            for p in &mut room.players {
                p.is_host = p.player_id == next_host_id;
                if p.is_host {
                    p.is_ready = true;
                }
            }
        }
    }

    let view = room.view();
    let recipients = room.human_ids();
    state.connections.send_many(
        &recipients,
        &ServerEvent::PlayerLeft {
            room_id,
            player_id,
            reason,
            new_host_id,
        },
    );
    state
        .connections
        .send_many(&recipients, &ServerEvent::RoomUpdated { room: view });
    info!("player {} left room {} ({:?})", player_id, room_id, reason);
    Ok(())
}

pub fn set_ready(
    state: &mut ServerState,
    ctx: &AuthCtx,
    room_id: Uuid,
    ready: bool,
) -> Result<(), ApiError> {
    if ctx.current_room_id != Some(room_id) {
        return Err(ApiError::Forbidden("you are not in this room".into()));
    }
    let room = state
        .registry
        .room_mut(&room_id)
        .ok_or(ApiError::NotFound("room"))?;
    if room.host_id == ctx.player_id && !ready {
        return Err(ApiError::Conflict("the host is always ready".into()));
    }
    let player = room
        .player_mut(ctx.player_id)
        .ok_or_else(|| ApiError::Forbidden("you are not in this room".into()))?;
    player.is_ready = ready;
    let view = room.view();
    let recipients = room.human_ids();
    state
        .connections
        .send_many(&recipients, &ServerEvent::RoomUpdated { room: view });
    Ok(())
}

pub fn change_team(
    state: &mut ServerState,
    ctx: &AuthCtx,
    room_id: Uuid,
    team_number: u8,
) -> Result<(), ApiError> {
    if ctx.current_room_id != Some(room_id) {
        return Err(ApiError::Forbidden("you are not in this room".into()));
    }
    let team = Team::from_number(team_number)
        .ok_or_else(|| ApiError::InvalidArg("team must be 1 or 2".into()))?;
    let room = state
        .registry
        .room_mut(&room_id)
        .ok_or(ApiError::NotFound("room"))?;
    if room.mode != GameMode::TwoVsTwo {
        return Err(ApiError::Conflict("team changes only apply to 2v2 rooms".into()));
    }
    if room.team_count(team, Some(ctx.player_id)) >= 2 {
        return Err(ApiError::Conflict("that team is full".into()));
    }
    let player = room
        .player_mut(ctx.player_id)
        .ok_or_else(|| ApiError::Forbidden("you are not in this room".into()))?;
    player.team = team;
    let view = room.view();
    let recipients = room.human_ids();
    state
        .connections
        .send_many(&recipients, &ServerEvent::RoomUpdated { room: view });
    Ok(())
}

/// Lobby projection of every room that has not finished.
pub fn list_rooms(state: &ServerState) -> Vec<LobbySummary> {
    let mut summaries: Vec<LobbySummary> = state
        .registry
        .rooms()
        .filter(|room| room.status != RoomStatus::Finished)
        .map(Room::summary)
        .collect();
    summaries.sort_by_key(|s| s.id);
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions;
    use shared::BoardType;

    fn setup_player(state: &mut ServerState, name: &str) -> AuthCtx {
        let (session_id, _) = sessions::join_server(state, name).unwrap();
        sessions::authenticate(state, &session_id.to_string()).unwrap()
    }

    fn refresh(state: &mut ServerState, ctx: &AuthCtx) -> AuthCtx {
        sessions::authenticate(state, &ctx.session_id.to_string()).unwrap()
    }

    fn make_room(state: &mut ServerState, ctx: &AuthCtx, mode: GameMode) -> Uuid {
        create_room(state, ctx, "test room", mode, BoardType::Classic, None)
            .unwrap()
            .id
    }

    #[test]
    fn test_create_room_sets_host() {
        let mut state = ServerState::new();
        let alice = setup_player(&mut state, "Alice");
        let view = create_room(
            &mut state,
            &alice,
            "  my room  ",
            GameMode::OneVsOne,
            BoardType::Classic,
            None,
        )
        .unwrap();
        assert_eq!(view.name, "my room");
        assert_eq!(view.host_id, alice.player_id);
        assert_eq!(view.players.len(), 1);
        assert!(view.players[0].is_host);
        assert!(view.players[0].is_ready);
        assert_eq!(view.players[0].team, Team::One);
        let session = state.registry.session(&alice.session_id).unwrap();
        assert_eq!(session.current_room_id, Some(view.id));
    }

    #[test]
    fn test_create_room_rejects_second_room() {
        let mut state = ServerState::new();
        let alice = setup_player(&mut state, "Alice");
        make_room(&mut state, &alice, GameMode::OneVsOne);
        let alice = refresh(&mut state, &alice);
        let result = create_room(
            &mut state,
            &alice,
            "another",
            GameMode::OneVsOne,
            BoardType::Classic,
            None,
        );
        assert!(matches!(result, Err(ApiError::Conflict(_))));
    }

    #[test]
    fn test_create_room_validates_name() {
        let mut state = ServerState::new();
        let alice = setup_player(&mut state, "Alice");
        for bad in ["ab", "   ", &"x".repeat(31)] {
            let result = create_room(
                &mut state,
                &alice,
                bad,
                GameMode::OneVsOne,
                BoardType::Classic,
                None,
            );
            assert!(matches!(result, Err(ApiError::InvalidArg(_))), "{bad:?}");
        }
    }

    #[test]
    fn test_join_balances_teams() {
        let mut state = ServerState::new();
        let alice = setup_player(&mut state, "Alice");
        let room_id = make_room(&mut state, &alice, GameMode::TwoVsTwo);

        let bob = setup_player(&mut state, "Bob");
        let view = join_room(&mut state, &bob, room_id, None).unwrap();
        assert_eq!(view.players[1].team, Team::Two);

        let carol = setup_player(&mut state, "Carol");
        let view = join_room(&mut state, &carol, room_id, None).unwrap();
        assert_eq!(view.players[2].team, Team::One);

        let dave = setup_player(&mut state, "Dave");
        let view = join_room(&mut state, &dave, room_id, None).unwrap();
        assert_eq!(view.players[3].team, Team::Two);

        let eve = setup_player(&mut state, "Eve");
        assert!(matches!(
            join_room(&mut state, &eve, room_id, None),
            Err(ApiError::Conflict(_))
        ));
    }

    #[test]
    fn test_join_checks_password() {
        let mut state = ServerState::new();
        let alice = setup_player(&mut state, "Alice");
        let view = create_room(
            &mut state,
            &alice,
            "secret room",
            GameMode::OneVsOne,
            BoardType::Classic,
            Some("hunter2".into()),
        )
        .unwrap();
        assert!(view.has_password);

        let bob = setup_player(&mut state, "Bob");
        assert!(matches!(
            join_room(&mut state, &bob, view.id, None),
            Err(ApiError::Conflict(_))
        ));
        assert!(matches!(
            join_room(&mut state, &bob, view.id, Some("wrong")),
            Err(ApiError::Conflict(_))
        ));
        assert!(join_room(&mut state, &bob, view.id, Some("hunter2")).is_ok());
    }

    #[test]
    fn test_leave_transfers_host_to_earliest_human() {
        let mut state = ServerState::new();
        let alice = setup_player(&mut state, "Alice");
        let room_id = make_room(&mut state, &alice, GameMode::TwoVsTwo);
        let bob = setup_player(&mut state, "Bob");
        join_room(&mut state, &bob, room_id, None).unwrap();
        let carol = setup_player(&mut state, "Carol");
        join_room(&mut state, &carol, room_id, None).unwrap();

        leave_room(&mut state, alice.player_id, LeaveReason::Leave).unwrap();
        let room = state.registry.room(&room_id).unwrap();
        assert_eq!(room.host_id, bob.player_id);
        let host = room.players.iter().find(|p| p.is_host).unwrap();
        assert_eq!(host.player_id, bob.player_id);
        assert!(host.is_ready);
        assert_eq!(
            room.players.iter().filter(|p| p.is_host).count(),
            1,
            "exactly one host"
        );
    }

    #[test]
    fn test_leave_deletes_empty_room() {
        let mut state = ServerState::new();
        let alice = setup_player(&mut state, "Alice");
        let room_id = make_room(&mut state, &alice, GameMode::OneVsOne);
        leave_room(&mut state, alice.player_id, LeaveReason::Leave).unwrap();
        assert!(state.registry.room(&room_id).is_none());
        let session = state.registry.session(&alice.session_id).unwrap();
        assert_eq!(session.current_room_id, None);
    }

    #[test]
    fn test_set_ready_and_host_rule() {
        let mut state = ServerState::new();
        let alice = setup_player(&mut state, "Alice");
        let room_id = make_room(&mut state, &alice, GameMode::OneVsOne);
        let bob = setup_player(&mut state, "Bob");
        join_room(&mut state, &bob, room_id, None).unwrap();
        let bob = refresh(&mut state, &bob);
        let alice = refresh(&mut state, &alice);

        set_ready(&mut state, &bob, room_id, true).unwrap();
        let room = state.registry.room(&room_id).unwrap();
        assert!(room.players[1].is_ready);

        assert!(matches!(
            set_ready(&mut state, &alice, room_id, false),
            Err(ApiError::Conflict(_))
        ));
    }

    #[test]
    fn test_change_team_rules() {
        let mut state = ServerState::new();
        let alice = setup_player(&mut state, "Alice");
        let solo_room = make_room(&mut state, &alice, GameMode::OneVsOne);
        let alice = refresh(&mut state, &alice);
        assert!(matches!(
            change_team(&mut state, &alice, solo_room, 2),
            Err(ApiError::Conflict(_))
        ));
        leave_room(&mut state, alice.player_id, LeaveReason::Leave).unwrap();

        let alice = refresh(&mut state, &alice);
        let room_id = make_room(&mut state, &alice, GameMode::TwoVsTwo);
        let alice = refresh(&mut state, &alice);
        assert!(matches!(
            change_team(&mut state, &alice, room_id, 3),
            Err(ApiError::InvalidArg(_))
        ));
        change_team(&mut state, &alice, room_id, 2).unwrap();
        let room = state.registry.room(&room_id).unwrap();
        assert_eq!(room.players[0].team, Team::Two);
    }

    #[test]
    fn test_change_team_refuses_full_team() {
        let mut state = ServerState::new();
        let alice = setup_player(&mut state, "Alice");
        let room_id = make_room(&mut state, &alice, GameMode::TwoVsTwo);
        let bob = setup_player(&mut state, "Bob");
        join_room(&mut state, &bob, room_id, None).unwrap();
        let carol = setup_player(&mut state, "Carol");
        join_room(&mut state, &carol, room_id, None).unwrap();
        // Teams now: Alice+Carol on 1, Bob on 2. Bob moving to 1 must fail.
        let bob = refresh(&mut state, &bob);
        assert!(matches!(
            change_team(&mut state, &bob, room_id, 1),
            Err(ApiError::Conflict(_))
        ));
        // Carol moving to 2 is fine.
        let carol = refresh(&mut state, &carol);
        change_team(&mut state, &carol, room_id, 2).unwrap();
    }

    #[test]
    fn test_list_rooms_skips_finished() {
        let mut state = ServerState::new();
        let alice = setup_player(&mut state, "Alice");
        let room_id = make_room(&mut state, &alice, GameMode::OneVsOne);
        assert_eq!(list_rooms(&state).len(), 1);
        state.registry.room_mut(&room_id).unwrap().status = RoomStatus::Finished;
        assert!(list_rooms(&state).is_empty());
    }
}
