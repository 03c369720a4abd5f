//! Scheduled background work: heartbeat sweep, registry maintenance, AI
//! latency, the rematch deadline, and the disconnect grace window.
//!
//! Every task is a plain `tokio::spawn` that reacquires the server lock
//! when it fires and lets the controller re-validate state, so cancellation
//! is implicit: a timer whose entity moved on simply does nothing.

use std::time::Duration;

use log::warn;
use rand::Rng;
use tokio::time::{interval, sleep};
use uuid::Uuid;

use crate::controller::{self, AiTurnDue, FollowUp, AI_DELAY_MAX_MS, AI_DELAY_MIN_MS};
use crate::fanout::{DISCONNECT_GRACE, HEARTBEAT_INTERVAL};
use crate::state::SharedState;
use crate::storage::MAINTENANCE_INTERVAL;

/// Long-lived tasks started once at boot.
pub fn spawn_background_tasks(state: &SharedState) {
    spawn_heartbeat(state.clone());
    spawn_maintenance(state.clone());
}

/// Periodic liveness sweep: channels with no ping inside the window are
/// terminated and their players enter the disconnect grace path.
pub fn spawn_heartbeat(state: SharedState) {
    tokio::spawn(async move {
        let mut ticker = interval(HEARTBEAT_INTERVAL);
        loop {
            ticker.tick().await;
            let stale = {
                let mut st = state.lock().await;
                st.connections.sweep_stale(HEARTBEAT_INTERVAL)
            };
            for player_id in stale {
                warn!("terminating unresponsive channel for player {player_id}");
                let generation = {
                    let mut st = state.lock().await;
                    st.connections.begin_grace(player_id)
                };
                spawn_disconnect_grace(state.clone(), player_id, generation);
            }
        }
    });
}

/// Minute-cadence registry GC.
pub fn spawn_maintenance(state: SharedState) {
    tokio::spawn(async move {
        let mut ticker = interval(MAINTENANCE_INTERVAL);
        loop {
            ticker.tick().await;
            let mut st = state.lock().await;
            controller::run_maintenance(&mut st);
        }
    });
}

/// Spawn the timers a controller call asked for.
pub fn spawn_follow_ups(state: &SharedState, follow_ups: Vec<FollowUp>) {
    for follow_up in follow_ups {
        match follow_up {
            FollowUp::AiTurn(due) => spawn_ai_turn(state.clone(), due),
            FollowUp::RematchDeadline { game_id, .. } => {
                spawn_rematch_deadline(state.clone(), game_id)
            }
        }
    }
}

/// Run one scheduled AI move after the latency delay, then keep chaining as
/// long as the next seat is also an AI.
pub fn spawn_ai_turn(state: SharedState, due: AiTurnDue) {
    tokio::spawn(async move {
        let mut pending = due;
        loop {
            let delay = rand::thread_rng().gen_range(AI_DELAY_MIN_MS..=AI_DELAY_MAX_MS);
            sleep(Duration::from_millis(delay)).await;
            let next = {
                let mut st = state.lock().await;
                controller::execute_ai_turn(&mut st, &pending)
            };
            match next {
                Some(next_due) => pending = next_due,
                None => break,
            }
        }
    });
}

/// Fire the rematch deadline sweep once the window elapses; the controller
/// re-checks the deadline and vote count under the lock.
pub fn spawn_rematch_deadline(state: SharedState, game_id: Uuid) {
    tokio::spawn(async move {
        sleep(Duration::from_secs(crate::game::REMATCH_WINDOW_SECS)).await;
        let mut st = state.lock().await;
        controller::rematch_deadline_fire(&mut st, game_id);
    });
}

/// Remove the player from their room (and possibly drop the session) if no
/// channel reattaches inside the grace window.
pub fn spawn_disconnect_grace(state: SharedState, player_id: Uuid, generation: u64) {
    tokio::spawn(async move {
        sleep(DISCONNECT_GRACE).await;
        let mut st = state.lock().await;
        if st.connections.grace_pending(player_id, generation) {
            controller::handle_disconnect_expired(&mut st, player_id);
        }
    });
}
