//! Greedy AI move selection at three difficulty levels.
//!
//! No policy looks ahead; each walks a fixed preference ladder and falls
//! back to a uniformly random legal move. The server drives room AIs at
//! `Medium`. With a double deck and Jacks always playable a legal move
//! always exists, so `None` from the selector is an invariant violation the
//! caller must treat as an internal error.

use rand::seq::SliceRandom;

use shared::{is_corner, Card, TeamColor, BOARD_SIZE};

use crate::game::Board;
use crate::sequence::{self, Line, SEQUENCE_LENGTH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AiMove {
    pub card_index: usize,
    pub row: usize,
    pub col: usize,
}

/// Everything a policy sees: the hand, the board, both colors, and how many
/// turns this AI has already taken.
pub struct AiContext<'a> {
    pub hand: &'a [Card],
    pub board: &'a Board,
    pub color: TeamColor,
    pub opponent: TeamColor,
    pub turn_number: usize,
}

pub fn select_move(difficulty: Difficulty, ctx: &AiContext<'_>) -> Option<AiMove> {
    match difficulty {
        Difficulty::Easy => easy(ctx),
        Difficulty::Medium => medium(ctx),
        Difficulty::Hard => hard(ctx),
    }
}

/// A 5-to-10-cell window with no blocking opponent chip.
struct Window {
    cells: Vec<(usize, usize)>,
    /// Chips of the window's color (corners excluded).
    own: usize,
}

/// Every window in the four directions whose cells are empty, corners, or
/// `color`, sorted by descending own-chip count.
fn potential_lines(board: &Board, color: TeamColor) -> Vec<Window> {
    let mut windows = Vec::new();
    for len in SEQUENCE_LENGTH..=2 * SEQUENCE_LENGTH {
        for row in 0..BOARD_SIZE {
            for col in 0..BOARD_SIZE {
                'dirs: for (dr, dc) in sequence::DIRECTIONS {
                    let mut cells = Vec::with_capacity(len);
                    let mut own = 0;
                    for step in 0..len {
                        let r = row as isize + dr * step as isize;
                        let c = col as isize + dc * step as isize;
                        if r < 0 || c < 0 || r >= BOARD_SIZE as isize || c >= BOARD_SIZE as isize {
                            continue 'dirs;
                        }
                        let (r, c) = (r as usize, c as usize);
                        match board.chip(r, c) {
                            Some(chip) if chip.color == color => own += 1,
                            Some(_) => continue 'dirs,
                            None => {}
                        }
                        cells.push((r, c));
                    }
                    windows.push(Window { cells, own });
                }
            }
        }
    }
    windows.sort_by(|a, b| b.own.cmp(&a.own));
    windows
}

/// Empty, in-bounds, non-corner cells adjacent to a line along its own
/// direction.
fn extension_points(board: &Board, line: &Line) -> Vec<(usize, usize)> {
    let (dr, dc) = line.direction();
    let (first_r, first_c) = line.cells[0];
    let (last_r, last_c) = *line.cells.last().expect("lines are never empty");
    let candidates = [
        (first_r as isize - dr, first_c as isize - dc),
        (last_r as isize + dr, last_c as isize + dc),
    ];
    candidates
        .into_iter()
        .filter(|&(r, c)| {
            r >= 0 && c >= 0 && r < BOARD_SIZE as isize && c < BOARD_SIZE as isize
        })
        .map(|(r, c)| (r as usize, c as usize))
        .filter(|&(r, c)| !is_corner(r, c) && board.chip(r, c).is_none())
        .collect()
}

/// A hand card playable on an empty non-corner cell: exact layout match
/// preferred, any two-eyed Jack otherwise.
fn playable_card_for(hand: &[Card], board: &Board, row: usize, col: usize) -> Option<usize> {
    let layout_card = board.layout_cell(row, col).card()?;
    if let Some(index) = hand.iter().position(|&card| card == layout_card) {
        return Some(index);
    }
    hand.iter().position(|card| card.is_two_eyed_jack())
}

/// Exact-match only, for blocking plays that must not spend a Jack.
fn exact_card_for(hand: &[Card], board: &Board, row: usize, col: usize) -> Option<usize> {
    let layout_card = board.layout_cell(row, col).card()?;
    hand.iter().position(|&card| card == layout_card)
}

/// Opponent chips a one-eyed Jack may take.
fn removable_chips(board: &Board, opponent: TeamColor) -> Vec<(usize, usize)> {
    let mut cells = Vec::new();
    for row in 0..BOARD_SIZE {
        for col in 0..BOARD_SIZE {
            if board
                .chip(row, col)
                .is_some_and(|chip| chip.color == opponent && !chip.part_of_sequence)
            {
                cells.push((row, col));
            }
        }
    }
    cells
}

fn one_eyed_jack_index(hand: &[Card]) -> Option<usize> {
    hand.iter().position(|card| card.is_one_eyed_jack())
}

/// Every move the rules allow for this hand.
fn legal_moves(ctx: &AiContext<'_>) -> Vec<AiMove> {
    let mut moves = Vec::new();
    for (card_index, card) in ctx.hand.iter().enumerate() {
        if card.is_one_eyed_jack() {
            for (row, col) in removable_chips(ctx.board, ctx.opponent) {
                moves.push(AiMove { card_index, row, col });
            }
            continue;
        }
        for row in 0..BOARD_SIZE {
            for col in 0..BOARD_SIZE {
                if is_corner(row, col) || ctx.board.chip(row, col).is_some() {
                    continue;
                }
                let matches = card.is_two_eyed_jack()
                    || ctx.board.layout_cell(row, col).card() == Some(*card);
                if matches {
                    moves.push(AiMove { card_index, row, col });
                }
            }
        }
    }
    moves
}

fn random_legal(ctx: &AiContext<'_>) -> Option<AiMove> {
    legal_moves(ctx).choose(&mut rand::thread_rng()).copied()
}

/// First playable extension of any own potential line, best lines first.
fn extend_potential(ctx: &AiContext<'_>, min_own: usize) -> Option<AiMove> {
    for window in potential_lines(ctx.board, ctx.color) {
        if window.own < min_own {
            continue;
        }
        for &(row, col) in &window.cells {
            if is_corner(row, col) || ctx.board.chip(row, col).is_some() {
                continue;
            }
            if let Some(card_index) = playable_card_for(ctx.hand, ctx.board, row, col) {
                return Some(AiMove { card_index, row, col });
            }
        }
    }
    None
}

/// Playable extension of an established line (length 5..9), longest lines
/// first.
fn extend_existing(ctx: &AiContext<'_>) -> Option<AiMove> {
    let mut lines: Vec<Line> = sequence::team_lines(ctx.board, ctx.color)
        .into_iter()
        .filter(|line| line.len() < 2 * SEQUENCE_LENGTH)
        .collect();
    lines.sort_by(|a, b| b.len().cmp(&a.len()));
    for line in &lines {
        for (row, col) in extension_points(ctx.board, line) {
            if let Some(card_index) = playable_card_for(ctx.hand, ctx.board, row, col) {
                return Some(AiMove { card_index, row, col });
            }
        }
    }
    None
}

/// Easy: spend a one-eyed Jack as soon as anything is removable, grow a
/// line on even turns, otherwise play at random.
fn easy(ctx: &AiContext<'_>) -> Option<AiMove> {
    if let Some(card_index) = one_eyed_jack_index(ctx.hand) {
        let removable = removable_chips(ctx.board, ctx.opponent);
        if let Some(&(row, col)) = removable.choose(&mut rand::thread_rng()) {
            return Some(AiMove { card_index, row, col });
        }
    }
    if ctx.turn_number % 2 == 0 {
        if let Some(ai_move) = extend_potential(ctx, 0) {
            return Some(ai_move);
        }
    }
    random_legal(ctx)
}

/// Medium: push established lines, then promising windows, then anything.
fn medium(ctx: &AiContext<'_>) -> Option<AiMove> {
    if let Some(ai_move) = extend_existing(ctx) {
        return Some(ai_move);
    }
    if let Some(ai_move) = extend_potential(ctx, 3) {
        return Some(ai_move);
    }
    if let Some(ai_move) = extend_potential(ctx, 0) {
        return Some(ai_move);
    }
    random_legal(ctx)
}

/// Hard: finish own lines, complete fours, attack with one-eyed Jacks,
/// block opponent windows, then fall through the medium ladder.
fn hard(ctx: &AiContext<'_>) -> Option<AiMove> {
    if let Some(ai_move) = extend_existing(ctx) {
        return Some(ai_move);
    }
    // Complete a window that already holds four own chips.
    for window in potential_lines(ctx.board, ctx.color) {
        if window.own != 4 {
            continue;
        }
        for &(row, col) in &window.cells {
            if is_corner(row, col) || ctx.board.chip(row, col).is_some() {
                continue;
            }
            if let Some(card_index) = playable_card_for(ctx.hand, ctx.board, row, col) {
                return Some(AiMove { card_index, row, col });
            }
        }
    }
    // One-eyed Jack against a threatening opponent window.
    if let Some(card_index) = one_eyed_jack_index(ctx.hand) {
        for window in potential_lines(ctx.board, ctx.opponent) {
            if window.own < 4 {
                continue;
            }
            for &(row, col) in &window.cells {
                if ctx
                    .board
                    .chip(row, col)
                    .is_some_and(|chip| chip.color == ctx.opponent && !chip.part_of_sequence)
                {
                    return Some(AiMove { card_index, row, col });
                }
            }
        }
    }
    // Block a growing opponent window with an ordinary card.
    for window in potential_lines(ctx.board, ctx.opponent) {
        if window.own < 3 {
            continue;
        }
        for &(row, col) in &window.cells {
            if is_corner(row, col) || ctx.board.chip(row, col).is_some() {
                continue;
            }
            if let Some(card_index) = exact_card_for(ctx.hand, ctx.board, row, col) {
                return Some(AiMove { card_index, row, col });
            }
        }
    }
    if let Some(ai_move) = extend_potential(ctx, 0) {
        return Some(ai_move);
    }
    random_legal(ctx)
}
