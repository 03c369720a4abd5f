//! Duplex channel registry and event fan-out.
//!
//! At most one live channel exists per player. `send` serializes the event
//! envelope into the player's unbounded outbox and returns immediately; a
//! per-connection writer task owns the socket, so nothing here blocks on
//! network I/O and sends to missing or closed channels are silent no-ops.
//!
//! Disconnect handling is generation-based: every attach bumps the player's
//! generation, and a pending removal timer only acts if the generation it
//! captured is still current. A reconnect inside the grace window therefore
//! cancels the removal without any timer bookkeeping.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use log::{debug, error, info};
use tokio::sync::mpsc;
use uuid::Uuid;

use shared::{EventEnvelope, ServerEvent};

use crate::utils::get_timestamp;

/// Liveness window: a channel with no inbound ping for this long is
/// terminated by the heartbeat sweep.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// How long a disconnected player keeps their room seat.
pub const DISCONNECT_GRACE: Duration = Duration::from_secs(10);

struct Connection {
    conn_id: u64,
    tx: mpsc::UnboundedSender<String>,
    last_seen: Instant,
}

pub struct FanoutManager {
    connections: HashMap<Uuid, Connection>,
    /// Bumped on every attach and grace start; stale timers compare against
    /// it and become no-ops.
    grace_generations: HashMap<Uuid, u64>,
    next_conn_id: u64,
}

impl FanoutManager {
    pub fn new() -> Self {
        FanoutManager {
            connections: HashMap::new(),
            grace_generations: HashMap::new(),
            next_conn_id: 1,
        }
    }

    /// Register a channel for a player, replacing any existing one and
    /// cancelling a pending disconnect removal. Returns the connection id
    /// and the receiving half for the writer task.
    pub fn attach(&mut self, player_id: Uuid) -> (u64, mpsc::UnboundedReceiver<String>) {
        let conn_id = self.next_conn_id;
        self.next_conn_id += 1;
        *self.grace_generations.entry(player_id).or_insert(0) += 1;

        let (tx, rx) = mpsc::unbounded_channel();
        let replaced = self
            .connections
            .insert(
                player_id,
                Connection {
                    conn_id,
                    tx,
                    last_seen: Instant::now(),
                },
            )
            .is_some();
        if replaced {
            info!("player {player_id} reattached, replacing previous channel");
        } else {
            info!("player {player_id} attached duplex channel");
        }
        (conn_id, rx)
    }

    /// Remove a channel, but only if `conn_id` still identifies it; a close
    /// from a superseded channel must not drop its replacement.
    pub fn detach(&mut self, player_id: Uuid, conn_id: u64) -> bool {
        if self
            .connections
            .get(&player_id)
            .is_some_and(|conn| conn.conn_id == conn_id)
        {
            self.connections.remove(&player_id);
            info!("player {player_id} channel closed");
            true
        } else {
            false
        }
    }

    /// Drop a player's channel unconditionally (leave-server, expiry).
    pub fn drop_channel(&mut self, player_id: Uuid) {
        self.connections.remove(&player_id);
    }

    pub fn is_connected(&self, player_id: Uuid) -> bool {
        self.connections.contains_key(&player_id)
    }

    pub fn connected_players(&self) -> HashSet<Uuid> {
        self.connections.keys().copied().collect()
    }

    /// Record channel liveness for the heartbeat sweep.
    pub fn mark_alive(&mut self, player_id: Uuid, conn_id: u64) {
        if let Some(conn) = self.connections.get_mut(&player_id) {
            if conn.conn_id == conn_id {
                conn.last_seen = Instant::now();
            }
        }
    }

    /// Push one event to one player. Serialization failures are logged and
    /// swallowed; dead channels are a silent no-op.
    pub fn send(&self, player_id: Uuid, event: &ServerEvent) {
        let Some(conn) = self.connections.get(&player_id) else {
            return;
        };
        let envelope = EventEnvelope {
            event,
            timestamp: get_timestamp(),
        };
        match serde_json::to_string(&envelope) {
            Ok(text) => {
                if conn.tx.send(text).is_err() {
                    debug!("channel for player {player_id} is gone, dropping event");
                }
            }
            Err(err) => error!("failed to serialize event for {player_id}: {err}"),
        }
    }

    /// Fan one event out to a set of players.
    pub fn send_many(&self, player_ids: &[Uuid], event: &ServerEvent) {
        for &player_id in player_ids {
            self.send(player_id, event);
        }
    }

    /// Drop channels that have not pinged within `max_idle`. Returns the
    /// affected players so the caller can start their grace timers.
    pub fn sweep_stale(&mut self, max_idle: Duration) -> Vec<Uuid> {
        let now = Instant::now();
        let stale: Vec<Uuid> = self
            .connections
            .iter()
            .filter(|(_, conn)| now.duration_since(conn.last_seen) > max_idle)
            .map(|(&player_id, _)| player_id)
            .collect();
        for player_id in &stale {
            self.connections.remove(player_id);
        }
        stale
    }

    /// Start the disconnect grace window and return the generation the
    /// timer must present to act.
    pub fn begin_grace(&mut self, player_id: Uuid) -> u64 {
        let generation = self.grace_generations.entry(player_id).or_insert(0);
        *generation += 1;
        *generation
    }

    /// True while the captured generation is still current and no channel
    /// reattached.
    pub fn grace_pending(&self, player_id: Uuid, generation: u64) -> bool {
        !self.is_connected(player_id)
            && self.grace_generations.get(&player_id) == Some(&generation)
    }

    /// Forget grace bookkeeping for a player whose session is gone.
    pub fn clear_grace(&mut self, player_id: Uuid) {
        self.grace_generations.remove(&player_id);
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

impl Default for FanoutManager {
    fn default() -> Self {
        Self::new()
    }
}
