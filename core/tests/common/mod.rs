#![allow(dead_code)]

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use sysmode_core::api::{ManagerOptions, MemoryStore, StateListener, StateManager, StaticResolver};

pub const MODE: &str = "DEVICE_OPTIMIZE";

#[derive(Default)]
pub struct RecordingListener {
    calls: Mutex<Vec<String>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl StateListener for RecordingListener {
    async fn request(&self, state: &str) -> anyhow::Result<()> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(state.to_string());
        Ok(())
    }
}

pub struct Harness {
    pub manager: StateManager,
    pub store: Arc<MemoryStore>,
    pub resolver: Arc<StaticResolver>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_options(ManagerOptions::default())
    }

    pub fn with_options(options: ManagerOptions) -> Self {
        let store = Arc::new(MemoryStore::new());
        let resolver = Arc::new(StaticResolver::new());
        let manager = StateManager::new(store.clone(), resolver.clone(), options);
        Self {
            manager,
            store,
            resolver,
        }
    }

    /// Makes `callsign` resolvable and returns its recorder.
    pub fn listener(&self, callsign: &str) -> Arc<RecordingListener> {
        let listener = RecordingListener::new();
        self.resolver.insert(callsign, listener.clone());
        listener
    }
}
