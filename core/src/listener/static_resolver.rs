use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use super::r#trait::{ListenerResolver, StateListener};
use crate::catalog::SystemMode;

/// Resolves callsigns from listeners registered in-process.
///
/// Embedders that host their clients in the same process use this; the
/// manager tests use it too.
#[derive(Default)]
pub struct StaticResolver {
    listeners: RwLock<HashMap<String, Arc<dyn StateListener>>>,
    released: AtomicBool,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, callsign: impl Into<String>, listener: Arc<dyn StateListener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(callsign.into(), listener);
    }

    pub fn remove(&self, callsign: &str) -> Option<Arc<dyn StateListener>> {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(callsign)
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ListenerResolver for StaticResolver {
    fn name(&self) -> &str {
        "static"
    }

    async fn resolve(&self, callsign: &str, _mode: SystemMode) -> Option<Arc<dyn StateListener>> {
        if self.is_released() {
            return None;
        }
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(callsign)
            .cloned()
    }

    fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
