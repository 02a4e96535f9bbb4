use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::catalog::{State, SystemMode};

/// When a newly activated client gets the current state pushed to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatchUpPolicy {
    /// Only after a request succeeded in this process.
    #[default]
    Session,
    /// Also when a state was already persisted before this process started.
    Persisted,
}

impl std::str::FromStr for CatchUpPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "session" => Ok(Self::Session),
            "persisted" => Ok(Self::Persisted),
            other => Err(format!("unknown catch-up policy: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ManagerOptions {
    pub catch_up: CatchUpPolicy,
    /// Keep callsigns persisted by a previous run so `restore_clients` can
    /// re-activate them. When false they are cleared at startup.
    pub restore_clients: bool,
    /// Upper bound on a single listener call. `None` leaves it to the
    /// listener's transport.
    pub listener_timeout: Option<Duration>,
}

/// Per-listener outcome of one state broadcast.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    pub state: String,
    /// RFC 3339 time the broadcast started.
    pub ts: String,
    pub delivered: Vec<String>,
    pub failed: Vec<ListenerFailure>,
    /// Whether the new state reached the store.
    pub persisted: bool,
}

impl BroadcastReport {
    pub fn attempted(&self) -> usize {
        self.delivered.len() + self.failed.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListenerFailure {
    pub callsign: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// Empty callsign or manager already shut down.
    Ignored,
    /// The resolver had no listener for the callsign.
    Unresolved,
    Registered {
        replaced: bool,
        /// State pushed to the new client right after registration.
        caught_up: Option<State>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModeStatus {
    pub mode: SystemMode,
    pub state: State,
    pub state_name: String,
    /// Catch-up latch for this mode.
    pub requested: bool,
    pub clients: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ManagerStats {
    pub requests: u64,
    pub notifications: u64,
    pub listener_failures: u64,
    pub persistence_failures: u64,
    pub catch_ups: u64,
    pub activations: u64,
    pub deactivations: u64,
}
