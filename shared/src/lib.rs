//! # Shared Protocol Library
//!
//! Everything the Sequence server and its clients must agree on byte for
//! byte: card primitives and their two-character codec, the three board
//! layouts, the deterministic deck engine, and the duplex event protocol.
//!
//! ## Core Components
//!
//! ### Cards (`cards`)
//! Ranks, suits, Jack classification (one-eyed removers vs two-eyed wilds)
//! and the `<Rank><SuitInitial>` string codec used in every payload that
//! carries a card.
//!
//! ### Board Layouts (`board`)
//! The three fixed 10x10 boards. Corners are wild for every team and never
//! hold a chip; each non-Jack card appears exactly twice per board.
//!
//! ### Deck Engine (`deck`)
//! Seeded 104-card shuffle built on mulberry32 + Fisher-Yates. Reconnecting
//! clients rebuild the deck from `(seed, cursor)`, so the algorithm here is
//! part of the protocol and must not drift.
//!
//! ### Events (`events`, `views`, `types`)
//! The tagged union of outbound duplex events, the `{type, data, timestamp}`
//! envelope, and the sanitized entity projections used by both the event
//! payloads and the request/response surface.

pub mod board;
pub mod cards;
pub mod deck;
pub mod events;
pub mod types;
pub mod views;

pub use board::{is_corner, layout_for, BoardLayout, BoardType, LayoutCell, BOARD_SIZE};
pub use cards::{Card, Rank, Suit};
pub use deck::{generate_seed, hand_size, shuffle, Mulberry32, DECK_SIZE};
pub use events::{ClientMessage, EventEnvelope, ServerEvent};
pub use types::{
    GameMode, GameStatus, LeaveReason, RematchCancelReason, RoomStatus, Team, TeamColor,
};
pub use views::{
    CellRef, ChipView, GamePlayerView, GameSnapshot, LobbySummary, RematchStateView,
    RematchVoteView, RoomPlayerView, RoomView, SequenceView, SnapshotCell, TeamView,
};
