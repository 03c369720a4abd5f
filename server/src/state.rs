//! Shared server state and the coarse serialization lock.
//!
//! The registry and the connection map are the only shared mutable
//! resources; one server-wide lock guards both. Handlers and timers acquire
//! it, mutate, and release before any socket I/O happens (channel writers
//! run in their own tasks), so the critical section never blocks on the
//! network.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::fanout::FanoutManager;
use crate::storage::Registry;

pub struct ServerState {
    pub registry: Registry,
    pub connections: FanoutManager,
}

impl ServerState {
    pub fn new() -> Self {
        ServerState {
            registry: Registry::new(),
            connections: FanoutManager::new(),
        }
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedState = Arc<Mutex<ServerState>>;

pub fn new_shared() -> SharedState {
    Arc::new(Mutex::new(ServerState::new()))
}
