//! # Mode state
//!
//! The manager owns the client registry and is the only writer of persisted
//! mode state. Registry membership sits behind one lock that is never held
//! while a client is being called.

pub mod manager;
pub mod registry;
pub mod types;

pub use manager::StateManager;
pub use registry::{ClientRegistry, NotifySnapshot};
pub use types::{
    Activation, BroadcastReport, CatchUpPolicy, ListenerFailure, ManagerOptions, ManagerStats,
    ModeStatus,
};
