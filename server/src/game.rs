//! Authoritative game state: board chips, hands, seat rotation, and the
//! turn protocol.
//!
//! `Game::apply_turn` is the single mutation path for moves; it validates
//! everything before touching any state, so a rejected turn leaves the game
//! bit-for-bit unchanged. Both human requests and the AI driver go through
//! it.

use std::time::Instant;

use uuid::Uuid;

use shared::{
    deck, is_corner, layout_for, BoardType, Card, CellRef, ChipView, GamePlayerView, GameSnapshot,
    GameStatus, LayoutCell, RematchStateView, RematchVoteView, SequenceView, SnapshotCell, Team,
    TeamColor, TeamView, BOARD_SIZE, DECK_SIZE,
};

use crate::error::ApiError;
use crate::rooms::Room;
use crate::sequence;
use crate::utils::get_timestamp;

/// Sequences a team needs to win.
pub const SEQUENCES_TO_WIN: usize = 2;

/// How long the table waits for everyone to vote on a rematch.
pub const REMATCH_WINDOW_SECS: u64 = 30;

/// A placed chip. Chips that belong to a recorded sequence are locked and
/// can no longer be removed by one-eyed Jacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chip {
    pub color: TeamColor,
    pub part_of_sequence: bool,
}

impl Chip {
    pub fn view(self) -> ChipView {
        ChipView {
            color: self.color,
            part_of_sequence: self.part_of_sequence,
        }
    }
}

/// Chip overlay on top of a static board layout.
#[derive(Debug, Clone)]
pub struct Board {
    board_type: BoardType,
    chips: [[Option<Chip>; BOARD_SIZE]; BOARD_SIZE],
}

impl Board {
    pub fn new(board_type: BoardType) -> Self {
        Board {
            board_type,
            chips: [[None; BOARD_SIZE]; BOARD_SIZE],
        }
    }

    pub fn board_type(&self) -> BoardType {
        self.board_type
    }

    pub fn layout_cell(&self, row: usize, col: usize) -> &'static LayoutCell {
        layout_for(self.board_type).cell(row, col)
    }

    pub fn chip(&self, row: usize, col: usize) -> Option<Chip> {
        self.chips[row][col]
    }

    pub fn place_chip(&mut self, row: usize, col: usize, color: TeamColor) {
        self.chips[row][col] = Some(Chip {
            color,
            part_of_sequence: false,
        });
    }

    pub fn clear_chip(&mut self, row: usize, col: usize) {
        self.chips[row][col] = None;
    }

    pub fn lock_chip(&mut self, row: usize, col: usize) {
        if let Some(chip) = &mut self.chips[row][col] {
            chip.part_of_sequence = true;
        }
    }

    pub fn snapshot_cells(&self) -> Vec<Vec<SnapshotCell>> {
        (0..BOARD_SIZE)
            .map(|row| {
                (0..BOARD_SIZE)
                    .map(|col| SnapshotCell {
                        card: self.layout_cell(row, col).card(),
                        chip: self.chips[row][col].map(Chip::view),
                    })
                    .collect()
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct GamePlayer {
    pub player_id: Uuid,
    pub display_name: String,
    pub team: Team,
    pub team_color: TeamColor,
    pub is_ai: bool,
    pub hand: Vec<Card>,
}

impl GamePlayer {
    pub fn view(&self) -> GamePlayerView {
        GamePlayerView {
            id: self.player_id,
            name: self.display_name.clone(),
            team_color: self.team_color,
            is_ai: self.is_ai,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TeamEntry {
    pub team: Team,
    pub color: TeamColor,
    pub player_ids: Vec<Uuid>,
}

#[derive(Debug, Clone)]
pub struct TurnRecord {
    pub player_id: Uuid,
    pub card_index: usize,
    pub row: usize,
    pub col: usize,
    pub card_played: Card,
    pub timestamp: u64,
}

/// What a successful turn did, for event payloads and AI chaining.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub card_played: Card,
    pub row: usize,
    pub col: usize,
    /// `None` when a one-eyed Jack removed a chip.
    pub chip_placed: Option<ChipView>,
    pub new_sequences: Vec<SequenceView>,
    pub finished: bool,
    pub next_player_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct Game {
    pub id: Uuid,
    pub room_id: Uuid,
    pub deck_seed: u32,
    pub board_type: BoardType,
    pub status: GameStatus,
    pub players: Vec<GamePlayer>,
    pub teams: [TeamEntry; 2],
    pub board: Board,
    pub sequences: Vec<SequenceView>,
    pub current_turn_player_id: Uuid,
    pub deck_cursor: usize,
    pub shuffled_deck: Vec<Card>,
    pub turn_history: Vec<TurnRecord>,
    pub winner_id: Option<Uuid>,
    pub created_at: u64,
    pub last_activity_at: Instant,
    pub finished_at: Option<u64>,
}

impl Game {
    /// Build a game from a room roster: seat order is the room's player
    /// order, hands are dealt as contiguous blocks from cursor 0, and the
    /// first seat acts first.
    pub fn from_room(room: &Room, deck_seed: u32) -> Game {
        let shuffled_deck = deck::shuffle(deck_seed);
        let hand_size = deck::hand_size(room.players.len());
        let mut deck_cursor = 0;

        let players: Vec<GamePlayer> = room
            .players
            .iter()
            .map(|p| {
                let hand = shuffled_deck[deck_cursor..deck_cursor + hand_size].to_vec();
                deck_cursor += hand_size;
                GamePlayer {
                    player_id: p.player_id,
                    display_name: p.display_name.clone(),
                    team: p.team,
                    team_color: p.team.color(),
                    is_ai: p.is_ai,
                    hand,
                }
            })
            .collect();

        let team_entry = |team: Team| TeamEntry {
            team,
            color: team.color(),
            player_ids: players
                .iter()
                .filter(|p| p.team == team)
                .map(|p| p.player_id)
                .collect(),
        };
        let teams = [team_entry(Team::One), team_entry(Team::Two)];
        let current_turn_player_id = players[0].player_id;

        Game {
            id: Uuid::new_v4(),
            room_id: room.id,
            deck_seed,
            board_type: room.board_type,
            status: GameStatus::Active,
            players,
            teams,
            board: Board::new(room.board_type),
            sequences: Vec::new(),
            current_turn_player_id,
            deck_cursor,
            shuffled_deck,
            turn_history: Vec::new(),
            winner_id: None,
            created_at: get_timestamp(),
            last_activity_at: Instant::now(),
            finished_at: None,
        }
    }

    pub fn player(&self, player_id: Uuid) -> Option<&GamePlayer> {
        self.players.iter().find(|p| p.player_id == player_id)
    }

    pub fn seat_index(&self, player_id: Uuid) -> Option<usize> {
        self.players.iter().position(|p| p.player_id == player_id)
    }

    pub fn human_ids(&self) -> Vec<Uuid> {
        self.players
            .iter()
            .filter(|p| !p.is_ai)
            .map(|p| p.player_id)
            .collect()
    }

    pub fn team_color_of(&self, player_id: Uuid) -> Option<TeamColor> {
        self.player(player_id).map(|p| p.team_color)
    }

    pub fn hand_target(&self) -> usize {
        deck::hand_size(self.players.len())
    }

    pub fn recorded_sequences(&self, color: TeamColor) -> usize {
        self.sequences.iter().filter(|s| s.team_color == color).count()
    }

    /// Turns this player has already taken, used as the AI policy clock.
    pub fn turn_count_of(&self, player_id: Uuid) -> usize {
        self.turn_history
            .iter()
            .filter(|t| t.player_id == player_id)
            .count()
    }

    pub fn player_views(&self) -> Vec<GamePlayerView> {
        self.players.iter().map(GamePlayer::view).collect()
    }

    pub fn team_views(&self) -> Vec<TeamView> {
        self.teams
            .iter()
            .map(|t| TeamView {
                team: t.team,
                color: t.color,
                player_ids: t.player_ids.clone(),
            })
            .collect()
    }

    /// Full state for one recipient; includes only that recipient's hand.
    pub fn snapshot(&self, viewer: Uuid) -> GameSnapshot {
        GameSnapshot {
            game_id: self.id,
            room_id: self.room_id,
            board_type: self.board_type,
            deck_seed: self.deck_seed,
            deck_cursor: self.deck_cursor,
            status: self.status,
            players: self.player_views(),
            teams: self.team_views(),
            board: self.board.snapshot_cells(),
            sequences: self.sequences.clone(),
            current_turn_player_id: self.current_turn_player_id,
            your_hand: self
                .player(viewer)
                .map(|p| p.hand.clone())
                .unwrap_or_default(),
            turn_count: self.turn_history.len(),
            winner_id: self.winner_id,
        }
    }

    /// Validate and execute one turn. Nothing is mutated until every check
    /// has passed.
    pub fn apply_turn(
        &mut self,
        player_id: Uuid,
        card_index: usize,
        row: usize,
        col: usize,
    ) -> Result<TurnOutcome, ApiError> {
        if self.status != GameStatus::Active {
            return Err(ApiError::Conflict("game is not active".into()));
        }
        if self.current_turn_player_id != player_id {
            return Err(ApiError::Conflict("not your turn".into()));
        }
        let seat = self
            .seat_index(player_id)
            .ok_or_else(|| ApiError::Internal(format!("current player {player_id} has no seat")))?;
        let color = self.players[seat].team_color;

        let card = *self.players[seat]
            .hand
            .get(card_index)
            .ok_or_else(|| ApiError::InvalidArg("card index out of range".into()))?;
        if row >= BOARD_SIZE || col >= BOARD_SIZE {
            return Err(ApiError::InvalidArg("cell out of range".into()));
        }

        let corner = is_corner(row, col);
        let occupant = self.board.chip(row, col);

        // Validate the cell against the card kind before mutating anything.
        let removes_chip = if card.is_two_eyed_jack() {
            if corner {
                return Err(ApiError::IllegalMove("cannot play on a corner".into()));
            }
            if occupant.is_some() {
                return Err(ApiError::IllegalMove("cell is already occupied".into()));
            }
            false
        } else if card.is_one_eyed_jack() {
            let chip = occupant
                .ok_or_else(|| ApiError::IllegalMove("no chip to remove there".into()))?;
            if chip.color == color {
                return Err(ApiError::IllegalMove("cannot remove your own chip".into()));
            }
            if chip.part_of_sequence {
                return Err(ApiError::IllegalMove("chip is locked in a sequence".into()));
            }
            true
        } else {
            if corner {
                return Err(ApiError::IllegalMove("cannot play on a corner".into()));
            }
            if occupant.is_some() {
                return Err(ApiError::IllegalMove("cell is already occupied".into()));
            }
            if self.board.layout_cell(row, col).card() != Some(card) {
                return Err(ApiError::IllegalMove(
                    "card does not match this cell".into(),
                ));
            }
            false
        };

        // Mutate the board.
        let chip_placed = if removes_chip {
            self.board.clear_chip(row, col);
            None
        } else {
            self.board.place_chip(row, col, color);
            self.board.chip(row, col).map(Chip::view)
        };

        // Detect and record any sequences the move completed.
        let recorded = self.recorded_sequences(color);
        let new_sequences = sequence::detect_new(&self.board, color, recorded);
        for seq in &new_sequences {
            sequence::mark(&mut self.board, seq);
            self.sequences.push(seq.clone());
        }

        let finished = self.recorded_sequences(color) >= SEQUENCES_TO_WIN;
        if finished {
            self.status = GameStatus::Finished;
            self.winner_id = Some(player_id);
            self.finished_at = Some(get_timestamp());
        }

        // Discard the played card and draw a replacement while the deck
        // lasts.
        self.players[seat].hand.remove(card_index);
        if self.deck_cursor < DECK_SIZE {
            let drawn = self.shuffled_deck[self.deck_cursor];
            self.players[seat].hand.push(drawn);
            self.deck_cursor += 1;
        }

        self.turn_history.push(TurnRecord {
            player_id,
            card_index,
            row,
            col,
            card_played: card,
            timestamp: get_timestamp(),
        });

        // Rotation freezes once the game is decided.
        if !finished {
            let next = (seat + 1) % self.players.len();
            self.current_turn_player_id = self.players[next].player_id;
        }
        self.last_activity_at = Instant::now();

        Ok(TurnOutcome {
            card_played: card,
            row,
            col,
            chip_placed,
            new_sequences,
            finished,
            next_player_id: self.current_turn_player_id,
        })
    }
}

/// Rematch voting for a finished game.
#[derive(Debug, Clone)]
pub struct RematchState {
    pub game_id: Uuid,
    pub active: bool,
    /// Insertion-ordered; one entry per player, overwritten on revote.
    pub votes: Vec<(Uuid, bool)>,
    pub required_votes: usize,
    pub deadline_at: Instant,
    pub deadline_ms: u64,
}

impl RematchState {
    pub fn new(game_id: Uuid, required_votes: usize) -> Self {
        RematchState {
            game_id,
            active: true,
            votes: Vec::new(),
            required_votes,
            deadline_at: Instant::now() + std::time::Duration::from_secs(REMATCH_WINDOW_SECS),
            deadline_ms: get_timestamp() + REMATCH_WINDOW_SECS * 1000,
        }
    }

    pub fn set_vote(&mut self, player_id: Uuid, vote: bool) {
        if let Some(entry) = self.votes.iter_mut().find(|(id, _)| *id == player_id) {
            entry.1 = vote;
        } else {
            self.votes.push((player_id, vote));
        }
    }

    pub fn yes_votes(&self) -> usize {
        self.votes.iter().filter(|(_, vote)| *vote).count()
    }

    pub fn view(&self) -> RematchStateView {
        RematchStateView {
            game_id: self.game_id,
            active: self.active,
            votes: self
                .votes
                .iter()
                .map(|&(player_id, vote)| RematchVoteView { player_id, vote })
                .collect(),
            yes_votes: self.yes_votes(),
            required_votes: self.required_votes,
            deadline: self.deadline_ms,
        }
    }
}

/// Cell list as wire refs.
pub fn cell_refs(cells: &[(usize, usize)]) -> Vec<CellRef> {
    cells.iter().map(|&(row, col)| CellRef { row, col }).collect()
}
