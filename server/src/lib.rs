//! # Sequence Game Server Library
//!
//! The authoritative server for networked Sequence. It owns the canonical
//! state of all sessions, rooms, and games, validates every move, drives
//! artificial opponents when a room is short of humans, and synchronizes
//! every state change to the interested subset of clients.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Validation
//! Every turn is checked against the board, the caller's hand, and the
//! rotation before anything is mutated. Clients only ever learn the result
//! through `turn_made` broadcasts; there is no client-trusted state.
//!
//! ### Session & Room Lifecycle
//! Sessions carry an opaque bearer token and a globally unique display
//! name. Rooms manage joins, readiness, team balance, and host transfer,
//! and are the unit from which games (and rematches) are built.
//!
//! ### Event Fan-out
//! Each player holds at most one duplex channel. Events are serialized to
//! `{type, data, timestamp}` objects and queued on per-connection outboxes
//! so the mutation critical section never blocks on the network. A 10 s
//! grace window tolerates transient drops without losing the room seat.
//!
//! ## Architecture
//!
//! One coarse `tokio::sync::Mutex` serializes the storage registry and the
//! connection map. Timers (AI latency, rematch deadline, disconnect grace,
//! heartbeat, GC) are spawned tasks that reacquire the lock and re-validate
//! entity state before acting, which makes every stale firing a no-op.
//!
//! ## Module Organization
//!
//! - [`storage`]: in-memory registry and background GC thresholds
//! - [`sessions`]: name allocation and session lifecycle
//! - [`rooms`]: room lifecycle and lobby projection
//! - [`game`]: board/hand/turn state machine and rematch voting state
//! - [`sequence`]: sequence detection with corner wildcards
//! - [`ai`]: greedy move policies at three difficulty levels
//! - [`fanout`]: duplex channel registry and event delivery
//! - [`controller`]: game orchestration and timer follow-ups
//! - [`handlers`] / [`ws`]: the `/v1` request surface and `/ws` endpoint
//! - [`tasks`]: spawned background timers

pub mod ai;
pub mod controller;
pub mod error;
pub mod fanout;
pub mod game;
pub mod handlers;
pub mod rooms;
pub mod sequence;
pub mod sessions;
pub mod state;
pub mod storage;
pub mod tasks;
pub mod utils;
pub mod ws;
