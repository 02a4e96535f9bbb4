//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `sysmode_core::api` instead of reaching into internal modules.

pub use crate::catalog::{ModeCatalog, ModeDescriptor, State, StateEntry, SystemMode};
pub use crate::config::{
    apply_env_overrides, fill_store_path, get_sysmode_data_dir, load_default, load_from,
    AppConfig, FileStoreConfig, ListenerConfig, LoggingConfig, ManagerConfig,
    StoreProvider,
};
pub use crate::context::{AppContext, Services, ServicesFactory};
pub use crate::error::{CliError, ModeError, StoreError};
pub use crate::listener::{ClientHandle, ListenerResolver, StateListener, StaticResolver};
pub use crate::state::{
    Activation, BroadcastReport, CatchUpPolicy, ListenerFailure, ManagerOptions, ManagerStats,
    ModeStatus, StateManager,
};
pub use crate::store::{MemoryStore, ModeRecords, ModeStore, KEY_CALLSIGN, KEY_CURRENT_STATE};
