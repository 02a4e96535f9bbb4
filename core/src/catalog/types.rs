use serde::{Deserialize, Serialize};
use std::fmt;

/// A named axis of device behaviour whose current setting can be requested.
///
/// The discriminant is the wire value used by hosts that address modes
/// numerically; the persisted section name comes from the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u32)]
pub enum SystemMode {
    DeviceOptimize = 1,
}

impl SystemMode {
    pub fn as_raw(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for SystemMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match super::ModeCatalog::mode_name(*self) {
            Some(name) => f.write_str(name),
            None => write!(f, "<mode {}>", self.as_raw()),
        }
    }
}

/// One legal value inside a mode's state space.
///
/// Which states a mode accepts is decided by its [`ModeDescriptor`], not by
/// this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u32)]
pub enum State {
    Video = 1,
    Game = 2,
}

impl State {
    pub fn as_raw(self) -> u32 {
        self as u32
    }
}

/// String encodings of a state within one mode.
#[derive(Debug)]
pub struct StateEntry {
    pub state: State,
    /// Persisted and broadcast encoding, e.g. `GAME`.
    pub name: &'static str,
    /// Human facing encoding, e.g. `game`.
    pub display: &'static str,
}

#[derive(Debug)]
pub struct ModeDescriptor {
    pub mode: SystemMode,
    /// Section key in the persisted store.
    pub name: &'static str,
    /// Written at startup when no state has been persisted yet.
    pub default_state: State,
    pub states: &'static [StateEntry],
}

impl ModeDescriptor {
    pub fn entry(&self, state: State) -> Option<&'static StateEntry> {
        self.states.iter().find(|e| e.state == state)
    }
}
