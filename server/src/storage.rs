//! In-memory registry owning every session, room, game, and rematch state.
//!
//! All lookups and mutations happen through the typed methods here while
//! the caller holds the server lock. Display-name reservation is atomic
//! with session insertion and removal, so the lowercased-name set can never
//! drift from the live session set. Missing keys are answered with `None`,
//! never a panic.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::game::{Game, RematchState};
use crate::rooms::Room;
use crate::sessions::Session;

/// Sessions idle longer than this are garbage collected.
pub const SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Games idle longer than this with every human disconnected are reclaimed.
pub const GAME_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(360);

/// Cadence of the background maintenance pass.
pub const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(60);

pub struct Registry {
    sessions: HashMap<Uuid, Session>,
    session_ids_by_player: HashMap<Uuid, Uuid>,
    reserved_names: HashSet<String>,
    rooms: HashMap<Uuid, Room>,
    games: HashMap<Uuid, Game>,
    rematches: HashMap<Uuid, RematchState>,
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            sessions: HashMap::new(),
            session_ids_by_player: HashMap::new(),
            reserved_names: HashSet::new(),
            rooms: HashMap::new(),
            games: HashMap::new(),
            rematches: HashMap::new(),
        }
    }

    // ── Sessions ────────────────────────────────────────────────────────

    pub fn name_taken(&self, lowered: &str) -> bool {
        self.reserved_names.contains(lowered)
    }

    /// Insert a session and reserve its name in one step.
    pub fn insert_session(&mut self, session: Session) {
        self.reserved_names
            .insert(session.display_name.to_lowercase());
        self.session_ids_by_player
            .insert(session.player_id, session.id);
        self.sessions.insert(session.id, session);
    }

    /// Remove a session and release its name in one step.
    pub fn remove_session(&mut self, session_id: &Uuid) -> Option<Session> {
        let session = self.sessions.remove(session_id)?;
        self.reserved_names
            .remove(&session.display_name.to_lowercase());
        self.session_ids_by_player.remove(&session.player_id);
        Some(session)
    }

    pub fn session(&self, session_id: &Uuid) -> Option<&Session> {
        self.sessions.get(session_id)
    }

    pub fn session_mut(&mut self, session_id: &Uuid) -> Option<&mut Session> {
        self.sessions.get_mut(session_id)
    }

    pub fn session_by_player(&self, player_id: &Uuid) -> Option<&Session> {
        let session_id = self.session_ids_by_player.get(player_id)?;
        self.sessions.get(session_id)
    }

    pub fn session_by_player_mut(&mut self, player_id: &Uuid) -> Option<&mut Session> {
        let session_id = self.session_ids_by_player.get(player_id)?;
        self.sessions.get_mut(session_id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    // ── Rooms ───────────────────────────────────────────────────────────

    pub fn insert_room(&mut self, room: Room) {
        self.rooms.insert(room.id, room);
    }

    pub fn remove_room(&mut self, room_id: &Uuid) -> Option<Room> {
        self.rooms.remove(room_id)
    }

    pub fn room(&self, room_id: &Uuid) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    pub fn room_mut(&mut self, room_id: &Uuid) -> Option<&mut Room> {
        self.rooms.get_mut(room_id)
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    // ── Games ───────────────────────────────────────────────────────────

    pub fn insert_game(&mut self, game: Game) {
        self.games.insert(game.id, game);
    }

    pub fn remove_game(&mut self, game_id: &Uuid) -> Option<Game> {
        self.games.remove(game_id)
    }

    pub fn game(&self, game_id: &Uuid) -> Option<&Game> {
        self.games.get(game_id)
    }

    pub fn game_mut(&mut self, game_id: &Uuid) -> Option<&mut Game> {
        self.games.get_mut(game_id)
    }

    pub fn game_count(&self) -> usize {
        self.games.len()
    }

    // ── Rematch states ──────────────────────────────────────────────────

    pub fn insert_rematch(&mut self, rematch: RematchState) {
        self.rematches.insert(rematch.game_id, rematch);
    }

    pub fn remove_rematch(&mut self, game_id: &Uuid) -> Option<RematchState> {
        self.rematches.remove(game_id)
    }

    pub fn rematch(&self, game_id: &Uuid) -> Option<&RematchState> {
        self.rematches.get(game_id)
    }

    pub fn rematch_mut(&mut self, game_id: &Uuid) -> Option<&mut RematchState> {
        self.rematches.get_mut(game_id)
    }

    // ── Maintenance queries ─────────────────────────────────────────────

    /// Sessions whose `last_activity` is older than the TTL.
    pub fn expired_session_ids(&self, now: Instant) -> Vec<Uuid> {
        self.sessions
            .values()
            .filter(|s| now.duration_since(s.last_activity) >= SESSION_TTL)
            .map(|s| s.id)
            .collect()
    }

    /// Rooms with no players at all.
    pub fn empty_room_ids(&self) -> Vec<Uuid> {
        self.rooms
            .values()
            .filter(|room| room.players.is_empty())
            .map(|room| room.id)
            .collect()
    }

    /// Games idle past the threshold whose human players are all offline.
    pub fn inactive_game_ids(&self, now: Instant, connected: &HashSet<Uuid>) -> Vec<Uuid> {
        self.games
            .values()
            .filter(|game| {
                now.duration_since(game.last_activity_at) >= GAME_INACTIVITY_TIMEOUT
                    && game.human_ids().iter().all(|id| !connected.contains(id))
            })
            .map(|game| game.id)
            .collect()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
