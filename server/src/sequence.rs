//! Sequence detection over the chip board.
//!
//! A line counts for a team when every cell on it is either a corner or a
//! chip of that team's color. Line identity is the pair of earliest cell
//! and direction, which keeps the scan from counting the same run once per
//! member cell. A run of 5..9 is one sequence; a full run of 10 is two.
//!
//! New-sequence detection is delta-based: the whole-board count for the
//! team is compared against the count already recorded on the game, and
//! exactly one batch of records is emitted per move.

use std::collections::HashSet;

use shared::{is_corner, SequenceView, TeamColor, BOARD_SIZE};

use crate::game::{cell_refs, Board};

pub const SEQUENCE_LENGTH: usize = 5;

/// Horizontal, vertical, and the two diagonals.
pub const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

/// Whether a coordinate counts toward `color`'s lines. Corners count for
/// every team.
fn counts_for(board: &Board, color: TeamColor, row: isize, col: isize) -> bool {
    if row < 0 || col < 0 || row >= BOARD_SIZE as isize || col >= BOARD_SIZE as isize {
        return false;
    }
    let (row, col) = (row as usize, col as usize);
    if is_corner(row, col) {
        return true;
    }
    board.chip(row, col).is_some_and(|chip| chip.color == color)
}

/// A maximal run of team-colored (or corner) cells, in direction order.
#[derive(Debug, Clone)]
pub struct Line {
    pub cells: Vec<(usize, usize)>,
}

impl Line {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The step between consecutive cells. Lines are always at least
    /// `SEQUENCE_LENGTH` long, so two cells exist.
    pub fn direction(&self) -> (isize, isize) {
        let (r0, c0) = self.cells[0];
        let (r1, c1) = self.cells[1];
        (r1 as isize - r0 as isize, c1 as isize - c0 as isize)
    }
}

/// Every maximal line of length >= 5 for a team, deduplicated by
/// `(start, direction)`.
pub fn team_lines(board: &Board, color: TeamColor) -> Vec<Line> {
    let mut seen: HashSet<(usize, usize, usize)> = HashSet::new();
    let mut lines = Vec::new();

    for row in 0..BOARD_SIZE {
        for col in 0..BOARD_SIZE {
            let has_own_chip = board
                .chip(row, col)
                .is_some_and(|chip| chip.color == color);
            if !has_own_chip {
                continue;
            }
            for (dir_index, &(dr, dc)) in DIRECTIONS.iter().enumerate() {
                // Step back to the line's earliest cell.
                let (mut start_r, mut start_c) = (row as isize, col as isize);
                while counts_for(board, color, start_r - dr, start_c - dc) {
                    start_r -= dr;
                    start_c -= dc;
                }
                if !seen.insert((start_r as usize, start_c as usize, dir_index)) {
                    continue;
                }
                // Sweep forward to the end.
                let mut cells = Vec::new();
                let (mut r, mut c) = (start_r, start_c);
                while counts_for(board, color, r, c) {
                    cells.push((r as usize, c as usize));
                    r += dr;
                    c += dc;
                }
                if cells.len() >= SEQUENCE_LENGTH {
                    lines.push(Line { cells });
                }
            }
        }
    }
    lines
}

/// Whole-board sequence count for a team: one per line, two for a 10-line.
pub fn total_sequences(board: &Board, color: TeamColor) -> usize {
    team_lines(board, color)
        .iter()
        .map(|line| if line.len() >= 2 * SEQUENCE_LENGTH { 2 } else { 1 })
        .sum()
}

/// Sequences completed by the most recent move, given how many the game has
/// already recorded for this team. Returns one record per increment; a
/// fresh 10-line yields two.
pub fn detect_new(board: &Board, color: TeamColor, recorded: usize) -> Vec<SequenceView> {
    let lines = team_lines(board, color);
    let total: usize = lines
        .iter()
        .map(|line| if line.len() >= 2 * SEQUENCE_LENGTH { 2 } else { 1 })
        .sum();
    let delta = total.saturating_sub(recorded);
    if delta == 0 {
        return Vec::new();
    }

    let is_fresh = |cell: &(usize, usize)| {
        let (row, col) = *cell;
        board
            .chip(row, col)
            .is_some_and(|chip| chip.color == color && !chip.part_of_sequence)
    };

    let mut records = Vec::new();
    for line in lines.iter().filter(|l| l.cells.iter().any(is_fresh)) {
        if records.len() == delta {
            break;
        }
        if line.len() >= 2 * SEQUENCE_LENGTH {
            // Both halves of the 10-line, the one holding the fresh chip
            // first.
            let mut halves = [
                &line.cells[0..SEQUENCE_LENGTH],
                &line.cells[SEQUENCE_LENGTH..2 * SEQUENCE_LENGTH],
            ];
            halves.sort_by_key(|half| !half.iter().any(is_fresh));
            for half in halves {
                if records.len() < delta {
                    records.push(SequenceView {
                        team_color: color,
                        cells: cell_refs(half),
                    });
                }
            }
        } else {
            // The 5-window holding a fresh chip with the most actual chips
            // (corners contribute nothing worth recording twice).
            let mut best: Option<(usize, usize)> = None;
            for start in 0..=line.len() - SEQUENCE_LENGTH {
                let window = &line.cells[start..start + SEQUENCE_LENGTH];
                if !window.iter().any(is_fresh) {
                    continue;
                }
                let chips = window
                    .iter()
                    .filter(|&&(r, c)| board.chip(r, c).is_some())
                    .count();
                if best.map_or(true, |(score, _)| chips > score) {
                    best = Some((chips, start));
                }
            }
            if let Some((_, start)) = best {
                records.push(SequenceView {
                    team_color: color,
                    cells: cell_refs(&line.cells[start..start + SEQUENCE_LENGTH]),
                });
            }
        }
    }
    records
}

/// Lock every chip of a recorded sequence, then re-trace the maximal lines
/// through its first cell so a 10-line locks all ten chips.
pub fn mark(board: &mut Board, seq: &SequenceView) {
    for cell in &seq.cells {
        board.lock_chip(cell.row, cell.col);
    }
    let Some(first) = seq.cells.first() else {
        return;
    };
    let color = seq.team_color;
    for (dr, dc) in DIRECTIONS {
        let (mut r, mut c) = (first.row as isize, first.col as isize);
        while counts_for(board, color, r - dr, c - dc) {
            r -= dr;
            c -= dc;
        }
        let mut run = Vec::new();
        while counts_for(board, color, r, c) {
            run.push((r as usize, c as usize));
            r += dr;
            c += dc;
        }
        if run.len() >= SEQUENCE_LENGTH {
            for (rr, cc) in run {
                board.lock_chip(rr, cc);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::BoardType;

    fn empty_board() -> Board {
        Board::new(BoardType::Classic)
    }

    fn place(board: &mut Board, cells: &[(usize, usize)], color: TeamColor) {
        for &(row, col) in cells {
            board.place_chip(row, col, color);
        }
    }

    fn record_and_mark(board: &mut Board, color: TeamColor, recorded: usize) -> Vec<SequenceView> {
        let found = detect_new(board, color, recorded);
        for seq in &found {
            mark(board, seq);
        }
        found
    }

    #[test]
    fn test_horizontal_five_is_one_sequence() {
        let mut board = empty_board();
        place(
            &mut board,
            &[(2, 2), (2, 3), (2, 4), (2, 5), (2, 6)],
            TeamColor::Green,
        );
        let found = detect_new(&board, TeamColor::Green, 0);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].team_color, TeamColor::Green);
        assert_eq!(found[0].cells.len(), 5);
        assert!(found[0].cells.iter().all(|c| c.row == 2));
    }

    #[test]
    fn test_detector_is_idempotent() {
        let mut board = empty_board();
        place(
            &mut board,
            &[(2, 2), (2, 3), (2, 4), (2, 5), (2, 6)],
            TeamColor::Green,
        );
        let found = record_and_mark(&mut board, TeamColor::Green, 0);
        assert_eq!(found.len(), 1);
        assert!(detect_new(&board, TeamColor::Green, 1).is_empty());
        assert_eq!(total_sequences(&board, TeamColor::Green), 1);
    }

    #[test]
    fn test_ten_in_a_row_counts_exactly_two() {
        let mut board = empty_board();
        let row: Vec<(usize, usize)> = (0..10).map(|col| (1, col)).collect();
        place(&mut board, &row, TeamColor::Blue);
        assert_eq!(total_sequences(&board, TeamColor::Blue), 2);

        let found = record_and_mark(&mut board, TeamColor::Blue, 0);
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|s| s.cells.len() == 5));
        // Every chip on the line ends up locked.
        for col in 0..10 {
            assert!(board.chip(1, col).unwrap().part_of_sequence);
        }
        // A later run never inflates the count past two.
        assert!(detect_new(&board, TeamColor::Blue, 2).is_empty());
        assert_eq!(total_sequences(&board, TeamColor::Blue), 2);
    }

    #[test]
    fn test_corner_counts_as_wild() {
        let mut board = empty_board();
        // Four chips next to the top-left corner complete a line of five.
        place(&mut board, &[(0, 1), (0, 2), (0, 3), (0, 4)], TeamColor::Green);
        let found = detect_new(&board, TeamColor::Green, 0);
        assert_eq!(found.len(), 1);
        assert!(found[0].cells.contains(&shared::CellRef { row: 0, col: 0 }));
        // The corner itself never holds a chip.
        assert!(board.chip(0, 0).is_none());
    }

    #[test]
    fn test_recorded_window_prefers_chips_over_corner() {
        let mut board = empty_board();
        // Run spans (0,0) corner plus chips at (0,1)..(0,5): six cells.
        place(
            &mut board,
            &[(0, 1), (0, 2), (0, 3), (0, 4), (0, 5)],
            TeamColor::Green,
        );
        let found = detect_new(&board, TeamColor::Green, 0);
        assert_eq!(found.len(), 1);
        let cols: Vec<usize> = found[0].cells.iter().map(|c| c.col).collect();
        assert_eq!(cols, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_one_chip_completing_two_lines_yields_two_records() {
        let mut board = empty_board();
        place(&mut board, &[(4, 0), (4, 1), (4, 2), (4, 3)], TeamColor::Green);
        place(&mut board, &[(0, 4), (1, 4), (2, 4), (3, 4)], TeamColor::Green);
        // The crossing chip finishes both runs at once.
        board.place_chip(4, 4, TeamColor::Green);
        let found = detect_new(&board, TeamColor::Green, 0);
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_opponent_chip_breaks_the_line() {
        let mut board = empty_board();
        place(&mut board, &[(2, 2), (2, 3), (2, 4), (2, 6)], TeamColor::Green);
        board.place_chip(2, 5, TeamColor::Blue);
        assert!(detect_new(&board, TeamColor::Green, 0).is_empty());
    }

    #[test]
    fn test_six_line_extension_does_not_recount() {
        let mut board = empty_board();
        place(
            &mut board,
            &[(6, 1), (6, 2), (6, 3), (6, 4), (6, 5)],
            TeamColor::Green,
        );
        record_and_mark(&mut board, TeamColor::Green, 0);
        // Extending to six cells is still the same single line.
        board.place_chip(6, 6, TeamColor::Green);
        assert!(detect_new(&board, TeamColor::Green, 1).is_empty());
    }
}
