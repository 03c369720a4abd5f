//! Sanitized projections of server entities.
//!
//! These are the only shapes that cross the wire: internal records hold
//! secrets (room passwords, other players' hands) that must never leave the
//! server, so every response and event payload is built from the structs
//! here instead of the entities themselves.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::board::BoardType;
use crate::cards::Card;
use crate::types::{GameMode, GameStatus, RoomStatus, Team, TeamColor};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomPlayerView {
    pub id: Uuid,
    pub name: String,
    pub is_host: bool,
    pub is_ready: bool,
    pub is_ai: bool,
    pub team: Team,
}

/// A room as clients see it; carries `has_password` instead of the password.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomView {
    pub id: Uuid,
    pub name: String,
    pub mode: GameMode,
    pub board_type: BoardType,
    pub has_password: bool,
    pub status: RoomStatus,
    pub players: Vec<RoomPlayerView>,
    pub max_players: usize,
    pub host_id: Uuid,
}

/// Lobby listing entry; only the player count, not the roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbySummary {
    pub id: Uuid,
    pub name: String,
    pub mode: GameMode,
    pub board_type: BoardType,
    pub has_password: bool,
    pub status: RoomStatus,
    pub players: usize,
    pub max_players: usize,
    pub host_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GamePlayerView {
    pub id: Uuid,
    pub name: String,
    pub team_color: TeamColor,
    pub is_ai: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamView {
    pub team: Team,
    pub color: TeamColor,
    pub player_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChipView {
    pub color: TeamColor,
    pub part_of_sequence: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceView {
    pub team_color: TeamColor,
    pub cells: Vec<CellRef>,
}

/// One board cell in a reconnection snapshot. `card` is `None` on corners.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotCell {
    pub card: Option<Card>,
    pub chip: Option<ChipView>,
}

/// Full game state for one recipient, sent on `session-status` so a
/// reconnecting client can rebuild its table. Contains only that
/// recipient's hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub game_id: Uuid,
    pub room_id: Uuid,
    pub board_type: BoardType,
    pub deck_seed: u32,
    pub deck_cursor: usize,
    pub status: GameStatus,
    pub players: Vec<GamePlayerView>,
    pub teams: Vec<TeamView>,
    pub board: Vec<Vec<SnapshotCell>>,
    pub sequences: Vec<SequenceView>,
    pub current_turn_player_id: Uuid,
    pub your_hand: Vec<Card>,
    pub turn_count: usize,
    pub winner_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RematchVoteView {
    pub player_id: Uuid,
    pub vote: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RematchStateView {
    pub game_id: Uuid,
    pub active: bool,
    pub votes: Vec<RematchVoteView>,
    pub yes_votes: usize,
    pub required_votes: usize,
    /// Unix milliseconds.
    pub deadline: u64,
}
