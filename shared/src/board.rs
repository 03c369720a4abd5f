//! The three fixed 10x10 board layouts.
//!
//! Every layout shares the same structure: the four corners are wild (they
//! count toward any team's sequence and never hold a chip), the remaining 96
//! cells carry playing cards, Jacks never appear on the board, and every
//! non-Jack card appears exactly twice. The layouts differ in how the two
//! copies of the 48-card set are traced across the grid.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::cards::{Card, Rank, Suit};

pub const BOARD_SIZE: usize = 10;

/// Which of the three printed boards a room plays on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardType {
    Classic,
    Alternative,
    Advanced,
}

impl BoardType {
    pub fn as_str(self) -> &'static str {
        match self {
            BoardType::Classic => "classic",
            BoardType::Alternative => "alternative",
            BoardType::Advanced => "advanced",
        }
    }
}

/// One cell of a board layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutCell {
    Corner,
    Card(Card),
}

impl LayoutCell {
    pub fn is_corner(&self) -> bool {
        matches!(self, LayoutCell::Corner)
    }

    pub fn card(&self) -> Option<Card> {
        match self {
            LayoutCell::Corner => None,
            LayoutCell::Card(card) => Some(*card),
        }
    }
}

/// A full 10x10 arrangement of cards and corners.
pub struct BoardLayout {
    cells: [[LayoutCell; BOARD_SIZE]; BOARD_SIZE],
}

impl BoardLayout {
    pub fn cell(&self, row: usize, col: usize) -> &LayoutCell {
        &self.cells[row][col]
    }
}

/// True for the four wild corner coordinates.
pub fn is_corner(row: usize, col: usize) -> bool {
    (row == 0 || row == BOARD_SIZE - 1) && (col == 0 || col == BOARD_SIZE - 1)
}

/// The prebuilt layout for a board type.
pub fn layout_for(board_type: BoardType) -> &'static BoardLayout {
    match board_type {
        BoardType::Classic => &CLASSIC,
        BoardType::Alternative => &ALTERNATIVE,
        BoardType::Advanced => &ADVANCED,
    }
}

static CLASSIC: Lazy<BoardLayout> = Lazy::new(|| build_layout(Traversal::RowMajor));
static ALTERNATIVE: Lazy<BoardLayout> = Lazy::new(|| build_layout(Traversal::Serpentine));
static ADVANCED: Lazy<BoardLayout> = Lazy::new(|| build_layout(Traversal::ColumnMajor));

/// Cell-filling order that distinguishes the three boards.
enum Traversal {
    RowMajor,
    Serpentine,
    ColumnMajor,
}

/// The 48 placeable cards (no Jacks), suit-major in codec order.
fn placement_cards() -> Vec<Card> {
    let mut cards = Vec::with_capacity(48);
    for suit in Suit::ALL {
        for rank in Rank::ALL {
            if rank != Rank::Jack {
                cards.push(Card::new(rank, suit));
            }
        }
    }
    cards
}

fn traversal_coords(traversal: &Traversal) -> Vec<(usize, usize)> {
    let mut coords = Vec::with_capacity(96);
    match traversal {
        Traversal::RowMajor => {
            for row in 0..BOARD_SIZE {
                for col in 0..BOARD_SIZE {
                    coords.push((row, col));
                }
            }
        }
        Traversal::Serpentine => {
            for row in 0..BOARD_SIZE {
                if row % 2 == 0 {
                    for col in 0..BOARD_SIZE {
                        coords.push((row, col));
                    }
                } else {
                    for col in (0..BOARD_SIZE).rev() {
                        coords.push((row, col));
                    }
                }
            }
        }
        Traversal::ColumnMajor => {
            for col in 0..BOARD_SIZE {
                for row in 0..BOARD_SIZE {
                    coords.push((row, col));
                }
            }
        }
    }
    coords.retain(|&(row, col)| !is_corner(row, col));
    coords
}

fn build_layout(traversal: Traversal) -> BoardLayout {
    let cards = placement_cards();
    let mut cells = [[LayoutCell::Corner; BOARD_SIZE]; BOARD_SIZE];
    for (index, (row, col)) in traversal_coords(&traversal).into_iter().enumerate() {
        cells[row][col] = LayoutCell::Card(cards[index % cards.len()]);
    }
    BoardLayout { cells }
}
